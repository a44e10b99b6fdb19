//! # Application object wrapper
//!
//! Holds a user object together with the table that maps method signatures to
//! handlers for its type.
//!
//! ## Philosophy
//!
//! - **Built Once**: A `DispatchTable<T>` is assembled when the type is registered and
//!   shared by every instance through an `Arc`. Dispatch is a single map lookup.
//! - **Single Owner**: A wrapper is not `Clone`. It has exactly one owner at a time and
//!   moves by value when the object migrates.
//! - **No Locking**: The wrapper takes `&mut self`; whoever owns it decides how calls are
//!   serialized.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use roamrpc::CallError;
use roamrpc::MethodCall;
use roamrpc::Signature;
use roamrpc::Value;

/// A method handler for objects of type `T`.
///
/// User-level failures are returned as `CallError::App` and travel back to the
/// caller untouched.
pub type Handler<T> = Arc<dyn Fn(&mut T, &[Value]) -> roamrpc::error::Result<Value> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Two handlers were registered under the same signature.
    DuplicateSignature(Signature),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSignature(sig) => write!(f, "signature registered twice: {}", sig),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Signature → handler map for one object type.
pub struct DispatchTable<T> {
    type_name: String,
    methods: HashMap<Signature, Handler<T>>,
}

impl<T> DispatchTable<T> {
    pub fn builder(type_name: impl Into<String>) -> DispatchTableBuilder<T> {
        DispatchTableBuilder {
            type_name: type_name.into(),
            methods: HashMap::new(),
            duplicate: None,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, sig: &Signature) -> Option<&Handler<T>> {
        self.methods.get(sig)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Fluent builder for a `DispatchTable`.
pub struct DispatchTableBuilder<T> {
    type_name: String,
    methods: HashMap<Signature, Handler<T>>,
    duplicate: Option<Signature>,
}

impl<T> DispatchTableBuilder<T> {
    pub fn method<F>(mut self, sig: impl Into<Signature>, handler: F) -> Self
    where
        F: Fn(&mut T, &[Value]) -> roamrpc::error::Result<Value> + Send + Sync + 'static,
    {
        let sig = sig.into();
        if self.methods.contains_key(&sig) {
            // report the first clash at build time
            self.duplicate.get_or_insert(sig);
            return self;
        }
        self.methods.insert(sig, Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Arc<DispatchTable<T>>, DispatchError> {
        if let Some(sig) = self.duplicate {
            return Err(DispatchError::DuplicateSignature(sig));
        }
        Ok(Arc::new(DispatchTable {
            type_name: self.type_name,
            methods: self.methods,
        }))
    }
}

/// Type-erased view of a bound object.
trait Dispatch: Send {
    fn dispatch(&mut self, call: &MethodCall) -> roamrpc::error::Result<Value>;
    fn type_name(&self) -> &str;
    fn signatures(&self) -> Vec<Signature>;
    fn responds_to(&self, sig: &Signature) -> bool;
}

struct Bound<T> {
    object: T,
    table: Arc<DispatchTable<T>>,
}

impl<T: Send + 'static> Dispatch for Bound<T> {
    fn dispatch(&mut self, call: &MethodCall) -> roamrpc::error::Result<Value> {
        let handler = self
            .table
            .get(call.signature())
            .ok_or_else(|| CallError::MethodNotFound(call.signature().clone()))?;
        handler(&mut self.object, call.args())
    }

    fn type_name(&self) -> &str {
        self.table.type_name()
    }

    fn signatures(&self) -> Vec<Signature> {
        let mut sigs: Vec<Signature> = self.table.methods.keys().cloned().collect();
        sigs.sort();
        sigs
    }

    fn responds_to(&self, sig: &Signature) -> bool {
        self.table.methods.contains_key(sig)
    }
}

/// Exclusive holder of a live user object.
pub struct AppObjectWrapper {
    inner: Box<dyn Dispatch>,
}

impl AppObjectWrapper {
    pub fn new<T: Send + 'static>(object: T, table: Arc<DispatchTable<T>>) -> Self {
        Self {
            inner: Box::new(Bound { object, table }),
        }
    }

    /// Resolves the call's signature and runs the handler.
    ///
    /// Fails with `MethodNotFound` for unknown signatures; anything the handler
    /// returns is passed through unchanged.
    pub fn invoke(&mut self, call: &MethodCall) -> roamrpc::error::Result<Value> {
        self.inner.dispatch(call)
    }

    pub fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    /// All signatures this object answers to, sorted.
    pub fn signatures(&self) -> Vec<Signature> {
        self.inner.signatures()
    }

    pub fn responds_to(&self, sig: &Signature) -> bool {
        self.inner.responds_to(sig)
    }
}

impl fmt::Debug for AppObjectWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppObjectWrapper")
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}

// Argument helpers for handlers.

/// Fails with `BadArguments` unless exactly `n` arguments were passed.
pub fn expect_arity(args: &[Value], n: usize) -> roamrpc::error::Result<()> {
    if args.len() != n {
        return Err(CallError::BadArguments(format!(
            "expected {} argument(s), got {}",
            n,
            args.len()
        )));
    }
    Ok(())
}

pub fn int_arg(args: &[Value], index: usize) -> roamrpc::error::Result<i64> {
    arg(args, index)?
        .as_int()
        .ok_or_else(|| mismatch(args, index, "int"))
}

pub fn str_arg(args: &[Value], index: usize) -> roamrpc::error::Result<&str> {
    arg(args, index)?
        .as_str()
        .ok_or_else(|| mismatch(args, index, "str"))
}

pub fn address_arg(args: &[Value], index: usize) -> roamrpc::error::Result<&roamrpc::HostAddress> {
    arg(args, index)?
        .as_address()
        .ok_or_else(|| mismatch(args, index, "address"))
}

fn arg(args: &[Value], index: usize) -> roamrpc::error::Result<&Value> {
    args.get(index).ok_or_else(|| {
        CallError::BadArguments(format!("missing argument {} of {}", index, args.len()))
    })
}

fn mismatch(args: &[Value], index: usize, expected: &str) -> CallError {
    let found = args.get(index).map(Value::kind).unwrap_or("nothing");
    CallError::BadArguments(format!(
        "argument {} must be {}, found {}",
        index, expected, found
    ))
}
