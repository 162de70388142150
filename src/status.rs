/// A one-line message for the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub ok: bool,
}

impl Status {
    /// Format a terminal token: the text after the first `:` (or the whole
    /// token), prefixed with `Success: ` for `OK...` and `Error: ` otherwise.
    pub fn from_token(token: &str) -> Self {
        let msg = match token.split_once(':') {
            Some((_, rest)) => rest,
            None => token,
        };
        if token.starts_with("OK") {
            Self::success(msg)
        } else {
            Self::error(msg)
        }
    }

    pub fn success(msg: impl AsRef<str>) -> Self {
        Self {
            message: format!("Success: {}", msg.as_ref()),
            ok: true,
        }
    }

    pub fn error(msg: impl AsRef<str>) -> Self {
        Self {
            message: format!("Error: {}", msg.as_ref()),
            ok: false,
        }
    }
}
