//! Rate limit key generation and handling.

/// A key that identifies one counter.
///
/// Each guard flavour keys its counters differently: by the client, by the
/// client combined with a header value, or by the request path alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    /// The client address
    Client(String),
    /// The client address together with a request header value
    ClientHeader {
        /// The client address
        client: String,
        /// The raw header value
        value: Vec<u8>,
    },
    /// The request path, shared by every client
    Route(String),
}

impl RateLimitKey {
    pub fn client(client: impl Into<String>) -> Self {
        Self::Client(client.into())
    }

    pub fn client_header(client: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::ClientHeader {
            client: client.into(),
            value: value.into(),
        }
    }

    pub fn route(path: impl Into<String>) -> Self {
        Self::Route(path.into())
    }

    /// Convert the key to a string representation.
    ///
    /// This is useful for logging and debugging. Header values that are not
    /// UTF-8 are rendered lossily, so distinct keys may render the same.
    pub fn to_string_key(&self) -> String {
        match self {
            RateLimitKey::Client(client) => client.clone(),
            RateLimitKey::ClientHeader { client, value } => format!("{}-{}", client, String::from_utf8_lossy(value)),
            RateLimitKey::Route(path) => path.clone(),
        }
    }
}

impl std::fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_key())
    }
}
