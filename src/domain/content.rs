use std::fmt;

use borsh::BorshSerialize;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::domain::{
    Extra, Principal,
    property::{Property, PropertyError, PropertyValue},
};

/// The number of consumers a license permits unless told otherwise.
pub const DEFAULT_CONSUMER_AMOUNT: i32 = 1;

/// The content of a software license.
///
/// Describes who holds a license, who issued it, what it licenses, how many
/// consumers may use it and when it is valid. This is the payload a license
/// notary signs into a license key and later extracts and checks.
///
/// Every attribute starts out absent, except `consumer_amount` which starts
/// at [`DEFAULT_CONSUMER_AMOUNT`]. Absent means "not yet known" and is distinct
/// from an empty string or zero.
///
/// The type stores values faithfully and never validates them: a
/// `not_after` earlier than `not_before`, or a non-positive
/// `consumer_amount`, are accepted. Checking them is the notary's job.
///
/// Timestamps are [`DateTime<Utc>`], an immutable `Copy` type, so getters and
/// setters exchange independent copies and a caller can never alias the
/// stored instant.
///
/// Equality compares all ten attributes. [`Clone`] shares the [`Extra`]
/// payload with the source and copies everything else.
///
/// To observe changes, wrap the content in an
/// [`ObservedContent`](crate::ObservedContent).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LicenseContent {
    holder: Option<Principal>,
    issuer: Option<Principal>,
    subject: Option<String>,
    issued: Option<DateTime<Utc>>,
    not_before: Option<DateTime<Utc>>,
    not_after: Option<DateTime<Utc>>,
    consumer_type: Option<String>,
    consumer_amount: i32,
    info: Option<String>,
    extra: Option<Extra>,
}

impl Default for LicenseContent {
    fn default() -> Self {
        Self {
            holder: None,
            issuer: None,
            subject: None,
            issued: None,
            not_before: None,
            not_after: None,
            consumer_type: None,
            consumer_amount: DEFAULT_CONSUMER_AMOUNT,
            info: None,
            extra: None,
        }
    }
}

impl LicenseContent {
    /// Creates empty license content.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The legal entity the license is granted to.
    #[must_use]
    pub const fn holder(&self) -> Option<&Principal> {
        self.holder.as_ref()
    }

    /// Sets the legal entity the license is granted to.
    pub fn set_holder(&mut self, holder: Option<Principal>) {
        self.holder = holder;
    }

    /// The legal entity granting the license.
    #[must_use]
    pub const fn issuer(&self) -> Option<&Principal> {
        self.issuer.as_ref()
    }

    /// Sets the legal entity granting the license.
    pub fn set_issuer(&mut self, issuer: Option<Principal>) {
        self.issuer = issuer;
    }

    /// What is licensed, typically a product name.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Sets what is licensed.
    pub fn set_subject(&mut self, subject: Option<String>) {
        self.subject = subject;
    }

    /// When the license was created.
    #[must_use]
    pub const fn issued(&self) -> Option<DateTime<Utc>> {
        self.issued
    }

    /// Sets when the license was created.
    pub const fn set_issued(&mut self, issued: Option<DateTime<Utc>>) {
        self.issued = issued;
    }

    /// The start of the validity window.
    #[must_use]
    pub const fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    /// Sets the start of the validity window.
    pub const fn set_not_before(&mut self, not_before: Option<DateTime<Utc>>) {
        self.not_before = not_before;
    }

    /// The end of the validity window.
    #[must_use]
    pub const fn not_after(&self) -> Option<DateTime<Utc>> {
        self.not_after
    }

    /// Sets the end of the validity window.
    pub const fn set_not_after(&mut self, not_after: Option<DateTime<Utc>>) {
        self.not_after = not_after;
    }

    /// The category of consumer, e.g. `user` or `device`.
    #[must_use]
    pub fn consumer_type(&self) -> Option<&str> {
        self.consumer_type.as_deref()
    }

    /// Sets the category of consumer.
    pub fn set_consumer_type(&mut self, consumer_type: Option<String>) {
        self.consumer_type = consumer_type;
    }

    /// The maximum number of consumers.
    #[must_use]
    pub const fn consumer_amount(&self) -> i32 {
        self.consumer_amount
    }

    /// Sets the maximum number of consumers.
    ///
    /// Zero and negative amounts are stored as given.
    pub const fn set_consumer_amount(&mut self, consumer_amount: i32) {
        self.consumer_amount = consumer_amount;
    }

    /// Informational text for the user. Not interpreted.
    #[must_use]
    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    /// Sets the informational text.
    pub fn set_info(&mut self, info: Option<String>) {
        self.info = info;
    }

    /// The application-private payload.
    #[must_use]
    pub const fn extra(&self) -> Option<&Extra> {
        self.extra.as_ref()
    }

    /// Sets the application-private payload.
    pub fn set_extra(&mut self, extra: Option<Extra>) {
        self.extra = extra;
    }

    /// Reads a single attribute by name.
    ///
    /// `consumerAmount` is always present.
    #[must_use]
    pub fn get(&self, property: Property) -> Option<PropertyValue> {
        match property {
            Property::Holder => self.holder.clone().map(PropertyValue::Principal),
            Property::Issuer => self.issuer.clone().map(PropertyValue::Principal),
            Property::Subject => self.subject.clone().map(PropertyValue::Text),
            Property::Issued => self.issued.map(PropertyValue::Timestamp),
            Property::NotBefore => self.not_before.map(PropertyValue::Timestamp),
            Property::NotAfter => self.not_after.map(PropertyValue::Timestamp),
            Property::ConsumerType => self.consumer_type.clone().map(PropertyValue::Text),
            Property::ConsumerAmount => Some(PropertyValue::Integer(self.consumer_amount)),
            Property::Info => self.info.clone().map(PropertyValue::Text),
            Property::Extra => self.extra.clone().map(PropertyValue::Extra),
        }
    }

    /// Writes a single attribute by name.
    ///
    /// `None` clears the attribute; clearing `consumerAmount` restores
    /// [`DEFAULT_CONSUMER_AMOUNT`].
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::Mismatch`] if the value is of the wrong kind
    /// for the attribute. The content is left unchanged in that case.
    pub fn set(
        &mut self,
        property: Property,
        value: Option<PropertyValue>,
    ) -> Result<(), PropertyError> {
        match property {
            Property::Holder => {
                self.set_holder(expect_kind(property, value, PropertyValue::into_principal)?);
            }
            Property::Issuer => {
                self.set_issuer(expect_kind(property, value, PropertyValue::into_principal)?);
            }
            Property::Subject => {
                self.set_subject(expect_kind(property, value, PropertyValue::into_text)?);
            }
            Property::Issued => {
                self.set_issued(expect_kind(property, value, PropertyValue::into_timestamp)?);
            }
            Property::NotBefore => {
                self.set_not_before(expect_kind(property, value, PropertyValue::into_timestamp)?);
            }
            Property::NotAfter => {
                self.set_not_after(expect_kind(property, value, PropertyValue::into_timestamp)?);
            }
            Property::ConsumerType => {
                self.set_consumer_type(expect_kind(property, value, PropertyValue::into_text)?);
            }
            Property::ConsumerAmount => {
                let amount = expect_kind(property, value, PropertyValue::into_integer)?;
                self.set_consumer_amount(amount.unwrap_or(DEFAULT_CONSUMER_AMOUNT));
            }
            Property::Info => {
                self.set_info(expect_kind(property, value, PropertyValue::into_text)?);
            }
            Property::Extra => {
                self.set_extra(expect_kind(property, value, PropertyValue::into_extra)?);
            }
        }
        Ok(())
    }

    /// The attributes whose values differ between `self` and `other`, in
    /// declaration order.
    ///
    /// Empty exactly when the two are equal.
    #[must_use]
    pub fn differences(&self, other: &Self) -> Vec<Property> {
        Property::ALL
            .into_iter()
            .filter(|&property| self.get(property) != other.get(property))
            .collect()
    }

    /// Returns a value generated by hashing every attribute of the content.
    ///
    /// Equal contents have equal fingerprints, and any change to an attribute
    /// changes the fingerprint. Unlike [`Hash`], the result is stable across
    /// processes and releases, so it can be stored and compared later.
    ///
    /// # Panics
    ///
    /// Panics if borsh serialization fails (which should never happen for this
    /// data structure).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        #[derive(BorshSerialize)]
        struct FingerprintData<'a> {
            holder: Option<&'a str>,
            issuer: Option<&'a str>,
            subject: Option<&'a str>,
            issued: Option<(i64, u32)>,
            not_before: Option<(i64, u32)>,
            not_after: Option<(i64, u32)>,
            consumer_type: Option<&'a str>,
            consumer_amount: i32,
            info: Option<&'a str>,
            extra: Option<String>,
        }

        let instant = |t: DateTime<Utc>| (t.timestamp(), t.timestamp_subsec_nanos());

        let data = FingerprintData {
            holder: self.holder.as_ref().map(Principal::canonical),
            issuer: self.issuer.as_ref().map(Principal::canonical),
            subject: self.subject(),
            issued: self.issued.map(instant),
            not_before: self.not_before.map(instant),
            not_after: self.not_after.map(instant),
            consumer_type: self.consumer_type(),
            consumer_amount: self.consumer_amount,
            info: self.info(),
            extra: self.extra.as_ref().map(Extra::canonical_text),
        };

        // encode using [borsh](https://borsh.io/)
        let encoded = borsh::to_vec(&data).expect("this should never fail");

        let hash = Sha256::digest(encoded);

        format!("{hash:x}")
    }
}

/// Extracts the statically typed value for `property`, or reports a mismatch.
fn expect_kind<T>(
    property: Property,
    value: Option<PropertyValue>,
    extract: fn(PropertyValue) -> Result<T, PropertyValue>,
) -> Result<Option<T>, PropertyError> {
    value
        .map(|value| {
            extract(value).map_err(|value| PropertyError::Mismatch {
                property,
                expected: property.kind(),
                actual: value.kind(),
            })
        })
        .transpose()
}

impl fmt::Display for LicenseContent {
    /// Lists the present attributes as `name=value` pairs.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for property in Property::ALL {
            if let Some(value) = self.get(property) {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{property}={value}")?;
                first = false;
            }
        }
        Ok(())
    }
}
