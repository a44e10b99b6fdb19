//! # Method calls
//!
//! A call names its target method by a fully qualified signature string
//! (declaring type, return type, parameter types). The signature is an opaque
//! key: two calls address the same method iff their signatures are equal.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Opaque, cheaply cloneable method key.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Signature(Arc<str>);

impl Signature {
    pub fn new(sig: impl AsRef<str>) -> Self {
        Self(Arc::from(sig.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Signature {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Signature {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Borrow<str> for Signature {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single invocation: which method, with which arguments.
///
/// Immutable once constructed; equality is structural.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodCall {
    signature: Signature,
    args: Vec<Value>,
}

impl MethodCall {
    pub fn new(signature: impl Into<Signature>, args: Vec<Value>) -> Self {
        Self {
            signature: signature.into(),
            args,
        }
    }

    /// A call with no arguments.
    pub fn nullary(signature: impl Into<Signature>) -> Self {
        Self::new(signature, Vec::new())
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}
