pub(crate) mod security_headers;
pub(crate) mod signature;
