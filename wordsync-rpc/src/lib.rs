//! # wordsync-rpc
//!
//! XML-RPC transport for the wordsync engine.
//!
//! [`XmlRpcClient`] implements [`wordsync_core::ContentStore`] over HTTP using
//! the `wp.*` term methods and the `gw.*` extension methods. [`codec`] holds the
//! wire encoding and can be used on its own.

pub mod client;
pub mod codec;
pub mod value;

pub use client::{endpoint_for, XmlRpcClient};
pub use codec::{decode_response, encode_call, CodecError, Response};
pub use value::Value;
