use std::{
    fmt,
    hash::{Hash, Hasher},
    iter::Peekable,
    ops::Deref,
    str::{Chars, FromStr},
    sync::LazyLock,
};

use non_empty_string::NonEmptyString;
use regex::Regex;

/// Attribute type keywords (`CN`, `O`, `emailAddress`) or dotted OIDs.
static ATTRIBUTE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9-]*|[0-9]+(?:\.[0-9]+)*)$").expect("this should never fail")
});

/// A validated attribute type of a distinguished name, such as `CN` or
/// `2.5.4.3`.
///
/// Keywords are normalised to upper case. An `OID.` prefix is accepted and
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeType(NonEmptyString);

impl AttributeType {
    /// Creates a new `AttributeType` from a string.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAttributeTypeError` if the string is neither a keyword
    /// (`[A-Za-z][A-Za-z0-9-]*`) nor a dotted OID.
    pub fn new(s: String) -> Result<Self, InvalidAttributeTypeError> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("OID.")
            .or_else(|| trimmed.strip_prefix("oid."))
            .unwrap_or(trimmed);

        if !ATTRIBUTE_TYPE.is_match(body) {
            return Err(InvalidAttributeTypeError(s));
        }

        NonEmptyString::new(body.to_ascii_uppercase())
            .map(Self)
            .map_err(|_| InvalidAttributeTypeError(s))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<&str> for AttributeType {
    type Error = InvalidAttributeTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl AsRef<str> for AttributeType {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for AttributeType {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string is not a valid attribute type.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid attribute type '{0}': expected a keyword (e.g. 'CN') or a dotted OID")]
pub struct InvalidAttributeTypeError(String);

/// A single `type=value` pair of a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    kind: AttributeType,
    value: String,
}

impl Attribute {
    /// The attribute type, e.g. `CN`.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.kind.as_str()
    }

    /// The unescaped attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}={}", self.kind, escape_value(&self.value))
    }
}

/// A relative distinguished name: one or more attributes joined by `+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
    attributes: Vec<Attribute>,
}

impl Rdn {
    /// The attributes of this RDN, in the order they were written.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut attributes = self.attributes.iter();
        if let Some(first) = attributes.next() {
            write!(f, "{first}")?;
        }
        for attribute in attributes {
            write!(f, "+{attribute}")?;
        }
        Ok(())
    }
}

/// A distinguished-name identity, such as the holder or issuer of a license.
///
/// Parsed from an RFC 4514 string like `CN=Alice, O=Acme Corp, C=DE`.
///
/// Two principals are equal when their canonical forms match: attribute types
/// compare case-insensitively, values compare case-insensitively with runs of
/// whitespace collapsed, and the attributes of a multi-valued RDN compare
/// regardless of order.
///
/// # Examples
///
/// ```
/// use license_content::Principal;
///
/// let alice: Principal = "cn=Alice,  o=Acme".parse().unwrap();
///
/// assert_eq!(alice.name(), "CN=Alice,O=Acme");
/// assert_eq!(alice.common_name(), Some("Alice"));
/// assert_eq!(alice, "CN=ALICE,O=acme".parse::<Principal>().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct Principal {
    rdns: Vec<Rdn>,
    canonical: String,
}

impl Principal {
    /// Parses a principal from its distinguished name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or not a well-formed
    /// distinguished name.
    pub fn new(name: &str) -> Result<Self, Error> {
        let rdns = parse_rdns(name)?;
        let canonical = canonical_key(&rdns);
        Ok(Self { rdns, canonical })
    }

    /// The RFC 2253 form of this name.
    ///
    /// This is the name a principal is reconstructed from, so
    /// `Principal::new(&p.name())` always equals `p`.
    #[must_use]
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// The relative distinguished names, most specific first.
    #[must_use]
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The first value of the given attribute type, if present.
    ///
    /// The attribute type is matched case-insensitively.
    #[must_use]
    pub fn attribute(&self, kind: &str) -> Option<&str> {
        self.rdns
            .iter()
            .flat_map(Rdn::attributes)
            .find(|attribute| attribute.kind().eq_ignore_ascii_case(kind))
            .map(Attribute::value)
    }

    /// The common name (`CN`) of this principal, if present.
    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.attribute("CN")
    }

    /// The canonical key that equality and hashing are based on.
    pub(crate) fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Principal {}

impl Hash for Principal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut rdns = self.rdns.iter();
        if let Some(first) = rdns.next() {
            write!(f, "{first}")?;
        }
        for rdn in rdns {
            write!(f, ",{rdn}")?;
        }
        Ok(())
    }
}

impl FromStr for Principal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Principal {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Errors that can occur when parsing a distinguished name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The name contains no attributes.
    #[error("Distinguished name is empty")]
    Empty,

    /// An RDN component has no `=` separating type and value.
    #[error("Invalid distinguished name '{0}': expected 'type=value'")]
    MissingEquals(String),

    /// An attribute type is not a keyword or OID.
    #[error(transparent)]
    AttributeType(#[from] InvalidAttributeTypeError),

    /// A backslash escape is incomplete or decodes to invalid UTF-8.
    #[error("Invalid escape sequence in distinguished name '{0}'")]
    Escape(String),

    /// A quoted value has no closing quote.
    #[error("Unterminated quoted value in distinguished name '{0}'")]
    UnterminatedQuote(String),

    /// Something other than a separator follows a quoted value.
    #[error("Unexpected character '{1}' after quoted value in distinguished name '{0}'")]
    TrailingCharacter(String, char),
}

fn parse_rdns(input: &str) -> Result<Vec<Rdn>, Error> {
    if input.trim().is_empty() {
        return Err(Error::Empty);
    }

    let mut chars = input.chars().peekable();
    let mut rdns = Vec::new();
    let mut attributes = Vec::new();

    loop {
        let kind = parse_type(&mut chars, input)?;
        let (value, separator) = parse_value(&mut chars, input)?;
        attributes.push(Attribute { kind, value });

        match separator {
            Some('+') => {}
            Some(_) => rdns.push(Rdn {
                attributes: std::mem::take(&mut attributes),
            }),
            None => {
                rdns.push(Rdn { attributes });
                return Ok(rdns);
            }
        }
    }
}

fn parse_type(chars: &mut Peekable<Chars<'_>>, input: &str) -> Result<AttributeType, Error> {
    let mut kind = String::new();
    loop {
        match chars.next() {
            Some('=') => return Ok(AttributeType::new(kind)?),
            Some(',' | ';' | '+') | None => return Err(Error::MissingEquals(input.to_string())),
            Some(c) => kind.push(c),
        }
    }
}

/// Reads one attribute value and the separator that ended it (`None` at the
/// end of input).
fn parse_value(
    chars: &mut Peekable<Chars<'_>>,
    input: &str,
) -> Result<(String, Option<char>), Error> {
    while chars.next_if_eq(&' ').is_some() {}

    if chars.next_if_eq(&'"').is_some() {
        return parse_quoted(chars, input);
    }

    let mut bytes = Vec::new();
    // unescaped trailing spaces are not part of the value
    let mut significant = 0;

    let separator = loop {
        match chars.next() {
            None => break None,
            Some(c @ (',' | ';' | '+')) => break Some(c),
            Some('\\') => {
                push_escape(chars, &mut bytes, input)?;
                significant = bytes.len();
            }
            Some(c) => {
                push_char(&mut bytes, c);
                if c != ' ' {
                    significant = bytes.len();
                }
            }
        }
    };

    bytes.truncate(significant);
    let value = String::from_utf8(bytes).map_err(|_| Error::Escape(input.to_string()))?;
    Ok((value, separator))
}

fn parse_quoted(
    chars: &mut Peekable<Chars<'_>>,
    input: &str,
) -> Result<(String, Option<char>), Error> {
    let mut bytes = Vec::new();
    loop {
        match chars.next() {
            None => return Err(Error::UnterminatedQuote(input.to_string())),
            Some('"') => break,
            Some('\\') => push_escape(chars, &mut bytes, input)?,
            Some(c) => push_char(&mut bytes, c),
        }
    }

    while chars.next_if_eq(&' ').is_some() {}

    let separator = match chars.next() {
        None => None,
        Some(c @ (',' | ';' | '+')) => Some(c),
        Some(c) => return Err(Error::TrailingCharacter(input.to_string(), c)),
    };

    let value = String::from_utf8(bytes).map_err(|_| Error::Escape(input.to_string()))?;
    Ok((value, separator))
}

/// Decodes the character(s) after a backslash: either a hex pair encoding one
/// UTF-8 byte, or a literal character.
fn push_escape(
    chars: &mut Peekable<Chars<'_>>,
    bytes: &mut Vec<u8>,
    input: &str,
) -> Result<(), Error> {
    let escape_error = || Error::Escape(input.to_string());

    let first = chars.next().ok_or_else(escape_error)?;
    match first.to_digit(16) {
        Some(high) => {
            let low = chars
                .next_if(char::is_ascii_hexdigit)
                .and_then(|c| c.to_digit(16))
                .ok_or_else(escape_error)?;
            let byte = u8::try_from(high * 16 + low).map_err(|_| escape_error())?;
            bytes.push(byte);
        }
        None => push_char(bytes, first),
    }
    Ok(())
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (i, c) in value.chars().enumerate() {
        if c == '\0' {
            escaped.push_str(r"\00");
            continue;
        }
        let leading = i == 0 && (c == ' ' || c == '#');
        let trailing = i == last && c == ' ';
        if leading || trailing || matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

fn canonical_value(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn canonical_key(rdns: &[Rdn]) -> String {
    rdns.iter()
        .map(|rdn| {
            let mut attributes = rdn
                .attributes
                .iter()
                .map(|attribute| {
                    format!(
                        "{}={}",
                        attribute.kind,
                        escape_value(&canonical_value(&attribute.value))
                    )
                })
                .collect::<Vec<_>>();
            attributes.sort();
            attributes.join("+")
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use test_case::test_case;

    use super::*;

    #[test]
    fn single_attribute() {
        let principal = Principal::new("CN=Alice").unwrap();
        assert_eq!(principal.rdns().len(), 1);
        assert_eq!(principal.rdns()[0].attributes()[0].kind(), "CN");
        assert_eq!(principal.rdns()[0].attributes()[0].value(), "Alice");
        assert_eq!(principal.name(), "CN=Alice");
    }

    #[test_case("CN=Alice", "CN=Alice"; "plain")]
    #[test_case("cn=Alice", "CN=Alice"; "lowercase type")]
    #[test_case("CN=Alice, O=Acme Corp, C=DE", "CN=Alice,O=Acme Corp,C=DE"; "spaces after commas")]
    #[test_case("CN=Alice;O=Acme", "CN=Alice,O=Acme"; "semicolon separator")]
    #[test_case("  CN = Alice  ", "CN=Alice"; "surrounding whitespace")]
    #[test_case("CN=Alice+UID=42,O=Acme", "CN=Alice+UID=42,O=Acme"; "multi-valued rdn")]
    #[test_case(r"CN=Doe\, John,O=Acme", r"CN=Doe\, John,O=Acme"; "escaped comma")]
    #[test_case(r#"CN="Doe, John",O=Acme"#, r"CN=Doe\, John,O=Acme"; "quoted value")]
    #[test_case(r"CN=\4A\C3\BCrgen", "CN=Jürgen"; "hex escapes")]
    #[test_case(r"CN=\ padded\ ", r"CN=\ padded\ "; "escaped edge spaces")]
    #[test_case(r"CN=\#hash", r"CN=\#hash"; "leading hash")]
    #[test_case("OID.2.5.4.3=Alice", "2.5.4.3=Alice"; "oid type")]
    #[test_case("CN=a=b", "CN=a=b"; "equals in value")]
    #[test_case("CN=", "CN="; "empty value")]
    fn parse_and_name(input: &str, expected: &str) {
        let principal = Principal::new(input).unwrap();
        assert_eq!(principal.name(), expected);
    }

    #[test_case(""; "empty")]
    #[test_case("   "; "blank")]
    fn empty_name_fails(input: &str) {
        assert_eq!(Principal::new(input), Err(Error::Empty));
    }

    #[test_case("Alice"; "no equals")]
    #[test_case("CN=Alice,"; "trailing separator")]
    #[test_case("CN=Alice,,O=Acme"; "empty rdn")]
    #[test_case("CN=Alice+"; "trailing plus")]
    fn missing_equals_fails(input: &str) {
        assert!(matches!(
            Principal::new(input),
            Err(Error::MissingEquals(_))
        ));
    }

    #[test_case("=Alice"; "empty type")]
    #[test_case("C N=Alice"; "space in type")]
    #[test_case("1CN=Alice"; "keyword starting with digit")]
    #[test_case("2.5..4=Alice"; "malformed oid")]
    fn invalid_type_fails(input: &str) {
        assert!(matches!(
            Principal::new(input),
            Err(Error::AttributeType(_))
        ));
    }

    #[test_case(r"CN=Alice\"; "dangling backslash")]
    #[test_case(r"CN=\4"; "single hex digit")]
    #[test_case(r"CN=\FF"; "invalid utf-8")]
    fn invalid_escape_fails(input: &str) {
        assert!(matches!(Principal::new(input), Err(Error::Escape(_))));
    }

    #[test]
    fn unterminated_quote_fails() {
        assert!(matches!(
            Principal::new(r#"CN="Alice"#),
            Err(Error::UnterminatedQuote(_))
        ));
    }

    #[test]
    fn text_after_quote_fails() {
        assert_eq!(
            Principal::new(r#"CN="Alice" Smith"#),
            Err(Error::TrailingCharacter(
                r#"CN="Alice" Smith"#.to_string(),
                'S'
            ))
        );
    }

    #[test_case("CN=Alice,O=Acme", "cn=alice, o=ACME"; "case and spacing")]
    #[test_case("CN=Alice  Smith", "CN=alice smith"; "collapsed whitespace")]
    #[test_case("CN=Alice+UID=42", "UID=42+CN=Alice"; "multi-valued order")]
    #[test_case(r#"CN="Doe, John""#, r"CN=Doe\, John"; "quoting style")]
    fn canonical_equality(a: &str, b: &str) {
        let a = Principal::new(a).unwrap();
        let b = Principal::new(b).unwrap();
        assert_eq!(a, b);

        let set: HashSet<Principal> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test_case("CN=Alice", "CN=Bob"; "different value")]
    #[test_case("CN=Alice,O=Acme", "O=Acme,CN=Alice"; "rdn order matters")]
    #[test_case("CN=Alice", "UID=Alice"; "different type")]
    #[test_case("CN=Alice", "CN=Alice,O=Acme"; "extra rdn")]
    fn canonical_inequality(a: &str, b: &str) {
        assert_ne!(Principal::new(a).unwrap(), Principal::new(b).unwrap());
    }

    #[test_case("CN=Alice, O=Acme"; "simple")]
    #[test_case(r"CN=Doe\, John+UID=7;O=Acme \<Ltd\>"; "escaped specials")]
    #[test_case(r"CN=\ lead,O=trail\ "; "edge spaces")]
    #[test_case(r"CN=\4A\C3\BCrgen"; "hex")]
    fn name_reconstructs_equal_principal(input: &str) {
        let original = Principal::new(input).unwrap();
        let rebuilt = Principal::new(&original.name()).unwrap();
        assert_eq!(original, rebuilt);
        assert_eq!(original.rdns(), rebuilt.rdns());
    }

    #[test]
    fn nul_is_hex_escaped() {
        let principal = Principal::new(r"CN=a\00b").unwrap();
        assert_eq!(principal.common_name(), Some("a\0b"));
        assert_eq!(principal.name(), r"CN=a\00b");
        assert_eq!(Principal::new(&principal.name()).unwrap(), principal);
    }

    #[test]
    fn attribute_lookup() {
        let principal = Principal::new("CN=Alice+UID=42,O=Acme,C=DE").unwrap();
        assert_eq!(principal.common_name(), Some("Alice"));
        assert_eq!(principal.attribute("uid"), Some("42"));
        assert_eq!(principal.attribute("o"), Some("Acme"));
        assert_eq!(principal.attribute("OU"), None);
    }

    #[test]
    fn attribute_type_normalisation() {
        assert_eq!(
            AttributeType::try_from("emailAddress").unwrap().as_str(),
            "EMAILADDRESS"
        );
        assert_eq!(AttributeType::try_from("oid.1.2.3").unwrap().as_str(), "1.2.3");
        assert!(AttributeType::try_from("").is_err());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            format!("{}", Error::MissingEquals("Alice".to_string())),
            "Invalid distinguished name 'Alice': expected 'type=value'"
        );
        assert_eq!(format!("{}", Error::Empty), "Distinguished name is empty");
    }
}
