// src/core/parameters.rs

use crate::{
    constants::{DEFAULT_SECTION, SEPARATOR_TOKEN},
    core::restrictions::Restriction,
};
use std::fmt;
use thiserror::Error;

/// Errors raised when a value does not fit its parameter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Invalid value '{value}' for parameter '{key}': {reason}")]
    InvalidParameterValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("Parameter '{key}' holds a {expected} value, got a {found} value.")]
    TypeMismatch {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("Invalid restriction '{text}' for a {kind} parameter.")]
    InvalidRestriction { kind: ValueKind, text: String },
}

// --- VALUE KINDS ---

/// The scalar types a parameter value can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Int,
    Double,
    Bool,
    File,
}

/// The declared type of a parameter: a scalar or an ordered list of scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Scalar(ScalarKind),
    List(ScalarKind),
}

impl ValueKind {
    pub fn scalar(self) -> ScalarKind {
        match self {
            Self::Scalar(kind) | Self::List(kind) => kind,
        }
    }

    pub fn is_list(self) -> bool {
        matches!(self, Self::List(_))
    }

    pub fn is_file(self) -> bool {
        self.scalar() == ScalarKind::File
    }

    /// Short textual name of the type, e.g. `int` or `double list`.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Scalar(ScalarKind::String) => "string",
            Self::Scalar(ScalarKind::Int) => "int",
            Self::Scalar(ScalarKind::Double) => "double",
            Self::Scalar(ScalarKind::Bool) => "bool",
            Self::Scalar(ScalarKind::File) => "file",
            Self::List(ScalarKind::String) => "string list",
            Self::List(ScalarKind::Int) => "int list",
            Self::List(ScalarKind::Double) => "double list",
            Self::List(ScalarKind::Bool) => "bool list",
            Self::List(ScalarKind::File) => "file list",
        }
    }

    /// Parses `text` according to the grammar of this kind.
    ///
    /// Returns `Ok(None)` for the null value: an empty string for numeric, bool
    /// and file kinds. Strings keep the empty string; lists turn it into the empty list.
    pub fn parse(self, text: &str) -> Result<Option<Value>, String> {
        match self {
            Self::Scalar(kind) => parse_scalar(kind, text),
            Self::List(kind) => {
                if text.is_empty() {
                    return Ok(Some(Value::empty_list(kind)));
                }
                let elements: Vec<&str> = text.split(SEPARATOR_TOKEN).collect();
                self.from_elements(&elements).map(Some)
            }
        }
    }

    /// Builds a list value from its element strings. Elements are rejected
    /// if they are empty or contain the reserved separator.
    pub fn from_elements<S: AsRef<str>>(self, elements: &[S]) -> Result<Value, String> {
        let kind = match self {
            Self::List(kind) => kind,
            Self::Scalar(_) => return Err(format!("a {} value is not a list", self)),
        };

        let mut value = Value::empty_list(kind);
        for element in elements {
            let element = element.as_ref();
            check_list_element(element)?;
            let scalar = parse_scalar(kind, element)?
                .ok_or_else(|| "list elements must not be empty".to_string())?;
            value.push_scalar(scalar);
        }
        Ok(value)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

fn check_list_element(element: &str) -> Result<(), String> {
    if element.is_empty() {
        return Err("list elements must not be empty".to_string());
    }
    if element.contains(SEPARATOR_TOKEN) {
        return Err(format!(
            "list element '{}' contains the reserved separator '{}'",
            element, SEPARATOR_TOKEN
        ));
    }
    Ok(())
}

fn parse_scalar(kind: ScalarKind, text: &str) -> Result<Option<Value>, String> {
    let trimmed = text.trim();
    match kind {
        ScalarKind::String => Ok(Some(Value::String(text.to_string()))),
        ScalarKind::File if text.is_empty() => Ok(None),
        ScalarKind::File => Ok(Some(Value::File(text.to_string()))),
        _ if trimmed.is_empty() => Ok(None),
        ScalarKind::Int => trimmed
            .parse::<i64>()
            .map(|v| Some(Value::Int(v)))
            .map_err(|e| format!("not an integer ({})", e)),
        ScalarKind::Double => trimmed
            .parse::<f64>()
            .map(|v| Some(Value::Double(v)))
            .map_err(|e| format!("not a floating point number ({})", e)),
        ScalarKind::Bool => {
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(Some(Value::Bool(true)))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(Some(Value::Bool(false)))
            } else {
                Err("expected 'true' or 'false'".to_string())
            }
        }
    }
}

// --- VALUES ---

/// A typed parameter value. One variant per scalar type and one per list type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    File(String),
    StringList(Vec<String>),
    IntList(Vec<i64>),
    DoubleList(Vec<f64>),
    BoolList(Vec<bool>),
    FileList(Vec<String>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::Scalar(ScalarKind::String),
            Self::Int(_) => ValueKind::Scalar(ScalarKind::Int),
            Self::Double(_) => ValueKind::Scalar(ScalarKind::Double),
            Self::Bool(_) => ValueKind::Scalar(ScalarKind::Bool),
            Self::File(_) => ValueKind::Scalar(ScalarKind::File),
            Self::StringList(_) => ValueKind::List(ScalarKind::String),
            Self::IntList(_) => ValueKind::List(ScalarKind::Int),
            Self::DoubleList(_) => ValueKind::List(ScalarKind::Double),
            Self::BoolList(_) => ValueKind::List(ScalarKind::Bool),
            Self::FileList(_) => ValueKind::List(ScalarKind::File),
        }
    }

    fn empty_list(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::String => Self::StringList(Vec::new()),
            ScalarKind::Int => Self::IntList(Vec::new()),
            ScalarKind::Double => Self::DoubleList(Vec::new()),
            ScalarKind::Bool => Self::BoolList(Vec::new()),
            ScalarKind::File => Self::FileList(Vec::new()),
        }
    }

    /// Appends a scalar of the matching type to a list value. Mismatched
    /// scalars are ignored; callers only pass scalars parsed for this list's kind.
    fn push_scalar(&mut self, scalar: Value) {
        match (self, scalar) {
            (Self::StringList(items), Self::String(v)) => items.push(v),
            (Self::IntList(items), Self::Int(v)) => items.push(v),
            (Self::DoubleList(items), Self::Double(v)) => items.push(v),
            (Self::BoolList(items), Self::Bool(v)) => items.push(v),
            (Self::FileList(items), Self::File(v)) => items.push(v),
            _ => {}
        }
    }

    /// The textual form of every element: one entry for scalars, one per item for lists.
    pub fn elements(&self) -> Vec<String> {
        match self {
            Self::String(v) | Self::File(v) => vec![v.clone()],
            Self::Int(v) => vec![v.to_string()],
            Self::Double(v) => vec![v.to_string()],
            Self::Bool(v) => vec![v.to_string()],
            Self::StringList(items) | Self::FileList(items) => items.clone(),
            Self::IntList(items) => items.iter().map(ToString::to_string).collect(),
            Self::DoubleList(items) => items.iter().map(ToString::to_string).collect(),
            Self::BoolList(items) => items.iter().map(ToString::to_string).collect(),
        }
    }

    /// Canonical string encoding. Lists join their elements with [`SEPARATOR_TOKEN`].
    pub fn string_rep(&self) -> String {
        if self.kind().is_list() {
            self.elements().join(SEPARATOR_TOKEN)
        } else {
            self.elements().concat()
        }
    }
}

// --- FILE ROLES ---

/// Whether a file parameter is read or written by the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileDirection {
    Input,
    Output,
}

/// Extra information carried by file parameters, used to derive ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRole {
    pub direction: FileDirection,
    /// The value names a prefix for generated files rather than a single file.
    pub is_prefix: bool,
    /// Accepted file extensions, without the leading `*.`.
    pub formats: Vec<String>,
}

// --- PARAMETER ---

/// A named, typed value holder with validation and a lossless string encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    key: String,
    kind: ValueKind,
    value: Option<Value>,
    description: String,
    section: String,
    is_optional: bool,
    is_advanced: bool,
    is_defaulted: bool,
    restriction: Option<Restriction>,
    file_role: Option<FileRole>,
}

impl Parameter {
    /// Creates a parameter holding `value`. Fails when the value does not validate.
    pub fn new(key: impl Into<String>, value: Value) -> Result<Self, ParameterError> {
        let mut parameter = Self::empty(key, value.kind());
        parameter.check(&value)?;
        parameter.value = Some(value);
        Ok(parameter)
    }

    /// Creates a parameter of the given kind with a null value.
    pub fn empty(key: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            key: key.into(),
            kind,
            value: None,
            description: String::new(),
            section: DEFAULT_SECTION.to_string(),
            is_optional: true,
            is_advanced: false,
            is_defaulted: true,
            restriction: None,
            file_role: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn mnemonic(&self) -> &'static str {
        self.kind.mnemonic()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// True when no value is stored. An empty string is a stored value.
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Replaces the stored value. The value must have this parameter's kind and
    /// pass [`Parameter::validate`]; on failure nothing changes.
    pub fn set_value(&mut self, value: Option<Value>) -> Result<(), ParameterError> {
        if let Some(v) = &value {
            self.check(v)?;
        }
        self.value = value;
        self.is_defaulted = false;
        Ok(())
    }

    /// Checks whether `value` is acceptable for this parameter.
    pub fn validate(&self, value: &Value) -> bool {
        self.check(value).is_ok()
    }

    fn check(&self, value: &Value) -> Result<(), ParameterError> {
        if value.kind() != self.kind {
            return Err(ParameterError::TypeMismatch {
                key: self.key.clone(),
                expected: self.kind,
                found: value.kind(),
            });
        }
        self.explain(value)
            .map_err(|reason| ParameterError::InvalidParameterValue {
                key: self.key.clone(),
                value: value.string_rep(),
                reason,
            })
    }

    fn explain(&self, value: &Value) -> Result<(), String> {
        if self.kind.is_list() {
            for element in value.elements() {
                check_list_element(&element)?;
            }
        }

        match value {
            Value::Double(v) if v.is_nan() => return Err("NaN is not a valid number".to_string()),
            Value::DoubleList(items) if items.iter().any(|v| v.is_nan()) => {
                return Err("NaN is not a valid number".to_string());
            }
            _ => {}
        }

        if let Some(restriction) = &self.restriction {
            restriction.check(value)?;
        }
        Ok(())
    }

    /// Canonical string encoding of the current value; the empty string when null.
    pub fn string_rep(&self) -> String {
        self.value.as_ref().map(Value::string_rep).unwrap_or_default()
    }

    /// Parses `text` (as produced by [`Parameter::string_rep`]) and stores the result.
    /// On failure the previous value is left untouched.
    pub fn fill_from_string(&mut self, text: &str) -> Result<(), ParameterError> {
        let parsed = self
            .kind
            .parse(text)
            .map_err(|reason| self.invalid(text, reason))?;
        self.set_value(parsed)
    }

    /// Fills a list parameter from individual element strings.
    pub fn fill_from_elements<S: AsRef<str>>(&mut self, elements: &[S]) -> Result<(), ParameterError> {
        let value = self.kind.from_elements(elements).map_err(|reason| {
            let joined: Vec<&str> = elements.iter().map(AsRef::as_ref).collect();
            self.invalid(&joined.join(SEPARATOR_TOKEN), reason)
        })?;
        self.set_value(Some(value))
    }

    fn invalid(&self, text: &str, reason: String) -> ParameterError {
        ParameterError::InvalidParameterValue {
            key: self.key.clone(),
            value: text.to_string(),
            reason,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// The category label used to group parameters, independent of tree position.
    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn set_section(&mut self, section: impl Into<String>) {
        self.section = section.into();
    }

    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    pub fn set_optional(&mut self, is_optional: bool) {
        self.is_optional = is_optional;
    }

    pub fn is_advanced(&self) -> bool {
        self.is_advanced
    }

    pub fn set_advanced(&mut self, is_advanced: bool) {
        self.is_advanced = is_advanced;
    }

    /// True until the value is explicitly set for the first time.
    pub fn is_defaulted(&self) -> bool {
        self.is_defaulted
    }

    pub fn set_defaulted(&mut self, is_defaulted: bool) {
        self.is_defaulted = is_defaulted;
    }

    pub fn restriction(&self) -> Option<&Restriction> {
        self.restriction.as_ref()
    }

    /// Installs a restriction. Fails, leaving the parameter unchanged, if the
    /// current value does not satisfy it.
    pub fn set_restriction(&mut self, restriction: Option<Restriction>) -> Result<(), ParameterError> {
        if let (Some(r), Some(v)) = (&restriction, &self.value) {
            r.check(v).map_err(|reason| self.invalid(&v.string_rep(), reason))?;
        }
        self.restriction = restriction;
        Ok(())
    }

    pub fn file_role(&self) -> Option<&FileRole> {
        self.file_role.as_ref()
    }

    pub fn set_file_role(&mut self, role: Option<FileRole>) {
        self.file_role = role;
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) = {}", self.key, self.kind, self.string_rep())
    }
}

// MARK: --- UNIT TESTS ---
