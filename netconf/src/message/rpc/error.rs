use std::{
    fmt::{self, Debug},
    str::FromStr,
    sync::Arc,
};

use quick_xml::{
    events::{BytesStart, Event},
    name::ResolveResult,
    NsReader,
};

use crate::message::{skip_element, xmlns, ReadError, ReadXml};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Errors {
    inner: Vec<Error>,
}

impl Errors {
    pub(super) const fn new() -> Self {
        Self { inner: Vec::new() }
    }

    /// Whether any of the contained errors has `error` severity.
    pub(super) fn has_errors(&self) -> bool {
        self.inner
            .iter()
            .any(|err| err.severity == Severity::Error)
    }

    pub(super) fn push(&mut self, err: Error) {
        self.inner.push(err);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.inner.iter()
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter().try_for_each(|err| writeln!(f, "{err}"))
    }
}

impl std::error::Error for Errors {}

/// A single `<rpc-error>` element.
///
/// Only the fields needed to report a failure are kept. `<error-app-tag>`, `<error-path>` and
/// `<error-info>` are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    error_type: Type,
    error_tag: Tag,
    severity: Severity,
    message: Option<Arc<str>>,
}

impl ReadXml for Error {
    #[tracing::instrument(skip_all, level = "debug")]
    fn read_xml(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Self, ReadError> {
        let end = start.to_end();
        let mut error_type = None;
        let mut error_tag = None;
        let mut severity = None;
        let mut message = None;
        loop {
            match reader.read_resolved_event()? {
                (ResolveResult::Bound(ns), Event::Start(tag))
                    if ns == xmlns::BASE
                        && tag.local_name().as_ref() == b"error-type"
                        && error_type.is_none() =>
                {
                    tracing::debug!(?tag);
                    error_type = Some(reader.read_text(tag.to_end().name())?.trim().parse()?);
                }
                (ResolveResult::Bound(ns), Event::Start(tag))
                    if ns == xmlns::BASE
                        && tag.local_name().as_ref() == b"error-tag"
                        && error_tag.is_none() =>
                {
                    tracing::debug!(?tag);
                    error_tag = Some(reader.read_text(tag.to_end().name())?.trim().parse()?);
                }
                (ResolveResult::Bound(ns), Event::Start(tag))
                    if ns == xmlns::BASE
                        && tag.local_name().as_ref() == b"error-severity"
                        && severity.is_none() =>
                {
                    tracing::debug!(?tag);
                    severity = Some(reader.read_text(tag.to_end().name())?.trim().parse()?);
                }
                (ResolveResult::Bound(ns), Event::Start(tag))
                    if ns == xmlns::BASE
                        && tag.local_name().as_ref() == b"error-message"
                        && message.is_none() =>
                {
                    tracing::debug!(?tag);
                    message = Some(reader.read_text(tag.to_end().name())?.trim().into());
                }
                // error-app-tag, error-path, error-info, and <source-daemon> on junos
                (_, Event::Start(tag)) => skip_element(reader, &tag)?,
                (_, Event::Comment(_)) => continue,
                (_, Event::End(tag)) if tag == end => break,
                (ns, event) => {
                    tracing::error!(?event, ?ns, "unexpected xml event");
                    return Err(ReadError::UnexpectedXmlEvent(event.into_owned()));
                }
            }
        }
        Ok(Self {
            error_type: error_type
                .ok_or_else(|| ReadError::missing_element("rpc-error", "error-type"))?,
            error_tag: error_tag
                .ok_or_else(|| ReadError::missing_element("rpc-error", "error-tag"))?,
            severity: severity
                .ok_or_else(|| ReadError::missing_element("rpc-error", "error-severity"))?,
            message,
        })
    }
}

impl Error {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub const fn tag(&self) -> Tag {
        self.error_tag
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.error_type, self.severity, self.error_tag
        )?;
        if let Some(message) = self.message() {
            write!(f, " ({message})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Type {
    Transport,
    Rpc,
    Protocol,
    Application,
}

impl FromStr for Type {
    type Err = ReadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transport" => Ok(Self::Transport),
            "rpc" => Ok(Self::Rpc),
            "protocol" => Ok(Self::Protocol),
            "application" => Ok(Self::Application),
            _ => Err(ReadError::UnknownErrorType(s.to_string())),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = match self {
            Self::Transport => "transport",
            Self::Rpc => "rpc",
            Self::Protocol => "protocol",
            Self::Application => "application",
        };
        f.write_str(ty)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tag {
    InUse,
    InvalidValue,
    TooBig,
    MissingAttribute,
    BadAttribute,
    UnknownAttribute,
    MissingElement,
    BadElement,
    UnknownElement,
    UnknownNamespace,
    AccessDenied,
    LockDenied,
    ResourceDenied,
    RollbackFailed,
    DataExists,
    DataMissing,
    OperationNotSupported,
    OperationFailed,
    MalformedMessage,

    // Deprecated:
    PartialOperation,
}

impl Tag {
    const fn as_str(self) -> &'static str {
        match self {
            Self::InUse => "in-use",
            Self::InvalidValue => "invalid-value",
            Self::TooBig => "too-big",
            Self::MissingAttribute => "missing-attribute",
            Self::BadAttribute => "bad-attribute",
            Self::UnknownAttribute => "unknown-attribute",
            Self::MissingElement => "missing-element",
            Self::BadElement => "bad-element",
            Self::UnknownElement => "unknown-element",
            Self::UnknownNamespace => "unknown-namespace",
            Self::AccessDenied => "access-denied",
            Self::LockDenied => "lock-denied",
            Self::ResourceDenied => "resource-denied",
            Self::RollbackFailed => "rollback-failed",
            Self::DataExists => "data-exists",
            Self::DataMissing => "data-missing",
            Self::OperationNotSupported => "operation-not-supported",
            Self::OperationFailed => "operation-failed",
            Self::MalformedMessage => "malformed-message",
            Self::PartialOperation => "partial-operation",
        }
    }
}

impl FromStr for Tag {
    type Err = ReadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-use" => Ok(Self::InUse),
            "invalid-value" => Ok(Self::InvalidValue),
            "too-big" => Ok(Self::TooBig),
            "missing-attribute" => Ok(Self::MissingAttribute),
            "bad-attribute" => Ok(Self::BadAttribute),
            "unknown-attribute" => Ok(Self::UnknownAttribute),
            "missing-element" => Ok(Self::MissingElement),
            "bad-element" => Ok(Self::BadElement),
            "unknown-element" => Ok(Self::UnknownElement),
            "unknown-namespace" => Ok(Self::UnknownNamespace),
            "access-denied" => Ok(Self::AccessDenied),
            "lock-denied" => Ok(Self::LockDenied),
            "resource-denied" => Ok(Self::ResourceDenied),
            "rollback-failed" => Ok(Self::RollbackFailed),
            "data-exists" => Ok(Self::DataExists),
            "data-missing" => Ok(Self::DataMissing),
            "operation-not-supported" => Ok(Self::OperationNotSupported),
            "operation-failed" => Ok(Self::OperationFailed),
            "malformed-message" => Ok(Self::MalformedMessage),
            "partial-operation" => Ok(Self::PartialOperation),
            _ => Err(ReadError::UnknownErrorTag(s.to_string())),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl FromStr for Severity {
    type Err = ReadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            _ => Err(ReadError::UnknownErrorSeverity(s.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self {
            Self::Error => "error",
            Self::Warning => "warning",
        };
        f.write_str(severity)
    }
}
