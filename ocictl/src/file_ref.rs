use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A `path[:mediaType]` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub path: String,
    /// Empty when the argument carried no media type
    pub media_type: String,
}

impl FileReference {
    /// Split on the first colon only; the media type keeps any further colons.
    pub fn parse(token: &str) -> Self {
        match token.split_once(':') {
            Some((path, media_type)) => Self {
                path: path.to_string(),
                media_type: media_type.to_string(),
            },
            None => Self {
                path: token.to_string(),
                media_type: String::new(),
            },
        }
    }

    pub fn media_type_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.media_type.is_empty() {
            default
        } else {
            &self.media_type
        }
    }
}

impl FromStr for FileReference {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.media_type.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}:{}", self.path, self.media_type)
        }
    }
}
