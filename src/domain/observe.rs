//! Change notification for license content.
//!
//! [`ObservedContent`] wraps a [`LicenseContent`] and reports every write to
//! registered [`ChangeListener`]s. Code that does not need notification uses
//! `LicenseContent` directly and pays nothing for it.
//!
//! Listeners run synchronously, on the caller's thread, in registration
//! order, after the attribute has been written. A listener only sees the
//! [`PropertyChange`]; it cannot mutate the content it observes while the
//! notification runs. If the wrapper is shared as `Rc<RefCell<_>>`, the
//! setter holds the mutable borrow for the whole notification, so a
//! reentrant `try_borrow_mut` from inside a listener fails instead of
//! interleaving a second change.

use std::{fmt, ops::Deref};

use chrono::{DateTime, Utc};

use crate::domain::{
    Extra, LicenseContent, Principal,
    property::{Property, PropertyError, PropertyValue},
};

/// A single attribute change, as delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    /// The attribute that was written.
    pub property: Property,
    /// The value before the write.
    pub old_value: Option<PropertyValue>,
    /// The value after the write.
    pub new_value: Option<PropertyValue>,
}

/// Receives [`PropertyChange`] notifications.
///
/// Implemented for every `Fn(&PropertyChange)`.
pub trait ChangeListener {
    /// Called once for every write to the observed content.
    fn property_changed(&self, change: &PropertyChange);
}

impl<F> ChangeListener for F
where
    F: Fn(&PropertyChange),
{
    fn property_changed(&self, change: &PropertyChange) {
        self(change);
    }
}

/// Identifies a registered listener so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// License content that notifies listeners whenever an attribute is written.
///
/// Reads go through [`Deref`] to the wrapped [`LicenseContent`]. Writes go
/// through the setters on this type, which mirror those of
/// `LicenseContent`. Every write notifies, even when the new value equals the
/// old one.
///
/// Listeners are not part of the content: they are not cloned, compared or
/// persisted, and content converted with [`From`] starts with none.
#[derive(Default)]
pub struct ObservedContent {
    content: LicenseContent,
    listeners: Vec<(ListenerId, Box<dyn ChangeListener>)>,
    next_id: u64,
}

impl ObservedContent {
    /// Wraps empty license content.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and returns its id.
    ///
    /// Listeners are notified in registration order.
    pub fn add_change_listener(&mut self, listener: impl ChangeListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener.
    ///
    /// Returns `true` if the listener was registered.
    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// The number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Unwraps the content, dropping all listeners.
    #[must_use]
    pub fn into_inner(self) -> LicenseContent {
        self.content
    }

    /// Sets the holder and notifies listeners.
    pub fn set_holder(&mut self, holder: Option<Principal>) {
        self.write(Property::Holder, |content| content.set_holder(holder));
    }

    /// Sets the issuer and notifies listeners.
    pub fn set_issuer(&mut self, issuer: Option<Principal>) {
        self.write(Property::Issuer, |content| content.set_issuer(issuer));
    }

    /// Sets the subject and notifies listeners.
    pub fn set_subject(&mut self, subject: Option<String>) {
        self.write(Property::Subject, |content| content.set_subject(subject));
    }

    /// Sets the issue time and notifies listeners.
    pub fn set_issued(&mut self, issued: Option<DateTime<Utc>>) {
        self.write(Property::Issued, |content| content.set_issued(issued));
    }

    /// Sets the start of the validity window and notifies listeners.
    pub fn set_not_before(&mut self, not_before: Option<DateTime<Utc>>) {
        self.write(Property::NotBefore, |content| {
            content.set_not_before(not_before);
        });
    }

    /// Sets the end of the validity window and notifies listeners.
    pub fn set_not_after(&mut self, not_after: Option<DateTime<Utc>>) {
        self.write(Property::NotAfter, |content| {
            content.set_not_after(not_after);
        });
    }

    /// Sets the consumer type and notifies listeners.
    pub fn set_consumer_type(&mut self, consumer_type: Option<String>) {
        self.write(Property::ConsumerType, |content| {
            content.set_consumer_type(consumer_type);
        });
    }

    /// Sets the consumer amount and notifies listeners.
    pub fn set_consumer_amount(&mut self, consumer_amount: i32) {
        self.write(Property::ConsumerAmount, |content| {
            content.set_consumer_amount(consumer_amount);
        });
    }

    /// Sets the informational text and notifies listeners.
    pub fn set_info(&mut self, info: Option<String>) {
        self.write(Property::Info, |content| content.set_info(info));
    }

    /// Sets the extra payload and notifies listeners.
    pub fn set_extra(&mut self, extra: Option<Extra>) {
        self.write(Property::Extra, |content| content.set_extra(extra));
    }

    /// Writes a single attribute by name and notifies listeners.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::Mismatch`] if the value is of the wrong kind
    /// for the attribute. Nothing is written and no listener is notified in
    /// that case.
    pub fn set(
        &mut self,
        property: Property,
        value: Option<PropertyValue>,
    ) -> Result<(), PropertyError> {
        let old_value = self.content.get(property);
        self.content.set(property, value)?;
        self.notify(property, old_value);
        Ok(())
    }

    fn write(&mut self, property: Property, mutate: impl FnOnce(&mut LicenseContent)) {
        let old_value = self.content.get(property);
        mutate(&mut self.content);
        self.notify(property, old_value);
    }

    fn notify(&self, property: Property, old_value: Option<PropertyValue>) {
        if self.listeners.is_empty() {
            return;
        }

        let change = PropertyChange {
            property,
            old_value,
            new_value: self.content.get(property),
        };

        for (_, listener) in &self.listeners {
            listener.property_changed(&change);
        }
    }
}

impl Deref for ObservedContent {
    type Target = LicenseContent;

    fn deref(&self) -> &Self::Target {
        &self.content
    }
}

impl From<LicenseContent> for ObservedContent {
    fn from(content: LicenseContent) -> Self {
        Self {
            content,
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl fmt::Debug for ObservedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedContent")
            .field("content", &self.content)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        rc::{Rc, Weak},
    };

    use chrono::TimeZone;

    use super::*;

    /// Registers a listener that records every change it sees.
    fn recorder(observed: &mut ObservedContent) -> (ListenerId, Rc<RefCell<Vec<PropertyChange>>>) {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        let id = observed.add_change_listener(move |change: &PropertyChange| {
            sink.borrow_mut().push(change.clone());
        });
        (id, changes)
    }

    #[test]
    fn setting_subject_notifies_once() {
        let mut observed = ObservedContent::new();
        let (_, changes) = recorder(&mut observed);

        observed.set_subject(Some("Foo".to_string()));

        assert_eq!(
            *changes.borrow(),
            vec![PropertyChange {
                property: Property::Subject,
                old_value: None,
                new_value: Some(PropertyValue::from("Foo")),
            }]
        );
        assert_eq!(observed.subject(), Some("Foo"));
    }

    #[test]
    fn notification_carries_old_and_new_values() {
        let mut observed = ObservedContent::new();
        let (_, changes) = recorder(&mut observed);
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        observed.set_not_after(Some(first));
        observed.set_not_after(Some(second));
        observed.set_consumer_amount(10);

        let changes = changes.borrow();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[1].property, Property::NotAfter);
        assert_eq!(changes[1].old_value, Some(PropertyValue::from(first)));
        assert_eq!(changes[1].new_value, Some(PropertyValue::from(second)));
        assert_eq!(changes[2].old_value, Some(PropertyValue::from(1)));
        assert_eq!(changes[2].new_value, Some(PropertyValue::from(10)));
    }

    #[test]
    fn unchanged_value_still_notifies() {
        let mut observed = ObservedContent::new();
        let (_, changes) = recorder(&mut observed);

        observed.set_info(None);

        assert_eq!(
            *changes.borrow(),
            vec![PropertyChange {
                property: Property::Info,
                old_value: None,
                new_value: None,
            }]
        );
    }

    #[test]
    fn every_setter_reports_its_property() {
        let mut observed = ObservedContent::new();
        let (_, changes) = recorder(&mut observed);
        let now = Utc.with_ymd_and_hms(2024, 5, 5, 5, 5, 5).unwrap();

        observed.set_holder(Some(Principal::new("CN=Alice").unwrap()));
        observed.set_issuer(Some(Principal::new("CN=Acme").unwrap()));
        observed.set_subject(Some("Widget".to_string()));
        observed.set_issued(Some(now));
        observed.set_not_before(Some(now));
        observed.set_not_after(Some(now));
        observed.set_consumer_type(Some("user".to_string()));
        observed.set_consumer_amount(2);
        observed.set_info(Some("hi".to_string()));
        observed.set_extra(Some(Extra::from("x")));

        let reported: Vec<Property> = changes.borrow().iter().map(|c| c.property).collect();
        assert_eq!(reported, Property::ALL.to_vec());
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let mut observed = ObservedContent::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            observed.add_change_listener(move |_: &PropertyChange| order.borrow_mut().push(name));
        }

        observed.set_consumer_type(Some("device".to_string()));

        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn removed_listener_is_not_notified() {
        let mut observed = ObservedContent::new();
        let (id, changes) = recorder(&mut observed);
        let (_, kept) = recorder(&mut observed);

        assert!(observed.remove_change_listener(id));
        assert!(!observed.remove_change_listener(id));
        assert_eq!(observed.listener_count(), 1);

        observed.set_subject(Some("Foo".to_string()));

        assert!(changes.borrow().is_empty());
        assert_eq!(kept.borrow().len(), 1);
    }

    #[test]
    fn reflective_set_notifies() {
        let mut observed = ObservedContent::new();
        let (_, changes) = recorder(&mut observed);

        observed
            .set(Property::ConsumerAmount, Some(PropertyValue::from(3)))
            .unwrap();

        assert_eq!(changes.borrow().len(), 1);
        assert_eq!(observed.consumer_amount(), 3);
    }

    #[test]
    fn rejected_set_does_not_notify() {
        let mut observed = ObservedContent::new();
        let (_, changes) = recorder(&mut observed);

        let result = observed.set(Property::Holder, Some(PropertyValue::from("CN=Alice")));

        assert!(matches!(result, Err(PropertyError::Mismatch { .. })));
        assert!(changes.borrow().is_empty());
        assert_eq!(observed.holder(), None);
    }

    #[test]
    fn wrapping_starts_without_listeners() {
        let mut content = LicenseContent::new();
        content.set_subject(Some("Widget".to_string()));

        let observed = ObservedContent::from(content.clone());

        assert_eq!(observed.listener_count(), 0);
        assert_eq!(*observed, content);
        assert_eq!(observed.into_inner(), content);
    }

    #[test]
    fn reentrant_mutation_is_refused() {
        let shared = Rc::new(RefCell::new(ObservedContent::new()));
        let weak: Weak<RefCell<ObservedContent>> = Rc::downgrade(&shared);
        let reentry_refused = Rc::new(Cell::new(false));
        let flag = Rc::clone(&reentry_refused);

        shared
            .borrow_mut()
            .add_change_listener(move |_: &PropertyChange| {
                let target = weak.upgrade().unwrap();
                flag.set(target.try_borrow_mut().is_err());
            });

        shared.borrow_mut().set_subject(Some("Foo".to_string()));

        assert!(reentry_refused.get());
        assert_eq!(shared.borrow().subject(), Some("Foo"));
    }
}
