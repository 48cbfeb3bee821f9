use thiserror::Error;

/// Error kinds raised while building targets and comparing samples.
///
/// These travel inside `anyhow::Error`; callers that need to react to the
/// kind can `downcast_ref::<SgeError>()`.
#[derive(Error, Debug)]
pub enum SgeError {
    #[error("Lookup failed: {what} '{key}' not found{}", SgeError::format_detail(msg))]
    Lookup {
        what: &'static str,
        key: String,
        msg: Option<String>,
    },

    #[error("Failed parsing {context}: {msg}")]
    Parse { context: String, msg: String },

    #[error("Invalid value: {0}")]
    Value(String),
}

impl SgeError {
    #[cold]
    pub fn lookup<K: Into<String>>(what: &'static str, key: K) -> Self {
        Self::Lookup {
            what,
            key: key.into(),
            msg: None,
        }
    }

    #[cold]
    pub fn lookup_in<K: Into<String>, M: Into<String>>(what: &'static str, key: K, msg: M) -> Self {
        Self::Lookup {
            what,
            key: key.into(),
            msg: Some(msg.into()),
        }
    }

    #[cold]
    pub fn parse<C: Into<String>, M: Into<String>>(context: C, msg: M) -> Self {
        Self::Parse {
            context: context.into(),
            msg: msg.into(),
        }
    }

    #[cold]
    pub fn value<M: Into<String>>(msg: M) -> Self {
        Self::Value(msg.into())
    }

    fn format_detail(msg: &Option<String>) -> String {
        match msg {
            Some(m) => format!(" in {m}"),
            None => String::new(),
        }
    }
}

#[cfg(test)]
impl SgeError {
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

/// The error kind, if `e` carries one
#[cfg(test)]
pub fn kind_of(e: &anyhow::Error) -> Option<&SgeError> {
    e.downcast_ref::<SgeError>()
}
