//! Shared fixtures: a todo-list object and a scripted executor that counts calls.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use roamrpc::AppError;
use roamrpc::CallError;
use roamrpc::HostAddress;
use roamrpc::MethodCall;
use roamrpc::ObjectId;
use roamrpc::Value;
use roamrpc::error::Result;

use roamrun::AppObjectWrapper;
use roamrun::ClientProxy;
use roamrun::DispatchTable;
use roamrun::ExecutorRef;
use roamrun::InMemoryRegistry;
use roamrun::MigrationCoordinator;
use roamrun::wrapper::expect_arity;
use roamrun::wrapper::str_arg;

pub const TO_STRING: &str = "public java.lang.String java.lang.Object.toString()";
pub const ADD_TODO: &str = "public java.lang.String hankstodo.TodoList.addToDo(java.lang.String)";
pub const GET_TODO: &str = "public java.util.List hankstodo.TodoList.getToDo()";
pub const COMPLETE_TODO: &str =
    "public boolean hankstodo.TodoList.completeToDo(java.lang.String) throws hankstodo.NoSuchItemException";

pub fn setup() {
    roamrun::telemetry::init_with("roamrun=debug");
}

pub fn addr(n: u8) -> HostAddress {
    HostAddress::new(format!("127.0.0.{}", n), 22346)
}

pub struct TodoList {
    name: String,
    items: Vec<String>,
}

pub fn todo_table() -> Arc<DispatchTable<TodoList>> {
    DispatchTable::builder("hankstodo.TodoList")
        .method(ADD_TODO, |list: &mut TodoList, args: &[Value]| {
            expect_arity(args, 1)?;
            list.items.push(str_arg(args, 0)?.to_string());
            Ok(Value::from("OK!"))
        })
        .method(GET_TODO, |list: &mut TodoList, _: &[Value]| {
            Ok(Value::List(list.items.iter().map(|s| Value::from(s.as_str())).collect()))
        })
        .method(COMPLETE_TODO, |list: &mut TodoList, args: &[Value]| {
            expect_arity(args, 1)?;
            let item = str_arg(args, 0)?;
            let Some(pos) = list.items.iter().position(|i| i == item) else {
                return Err(CallError::App(AppError::new(
                    "NoSuchItemException",
                    format!("{} has no item '{}'", list.name, item),
                )));
            };
            list.items.remove(pos);
            Ok(Value::Bool(true))
        })
        .method(TO_STRING, |list: &mut TodoList, _: &[Value]| {
            Ok(Value::Str(format!("TodoList({}, {} items)", list.name, list.items.len())))
        })
        .build()
        .expect("todo table")
}

pub fn todo_list(name: &str) -> AppObjectWrapper {
    AppObjectWrapper::new(
        TodoList {
            name: name.to_string(),
            items: Vec::new(),
        },
        todo_table(),
    )
}

pub fn add(item: &str) -> MethodCall {
    MethodCall::new(ADD_TODO, vec![Value::from(item)])
}

pub fn get() -> MethodCall {
    MethodCall::nullary(GET_TODO)
}

pub fn item_count(v: &Value) -> usize {
    v.as_list().map(|items| items.len()).unwrap_or(0)
}

pub fn proxy_with_hosts(target: Arc<dyn ExecutorRef>, hosts: &[HostAddress]) -> ClientProxy {
    let registry = Arc::new(InMemoryRegistry::with_hosts(hosts.iter().cloned()));
    ClientProxy::new(target, Arc::new(MigrationCoordinator::new(registry)))
}

/// Executor stand-in that replays scripted outcomes and counts what it was asked.
#[derive(Debug)]
pub struct ScriptedExecutor {
    object_id: ObjectId,
    address: HostAddress,
    script: Mutex<VecDeque<Result<Value>>>,
    fallback: Result<Value>,
    migrate_failures: usize,
    invokes: AtomicUsize,
    migrations: AtomicUsize,
    seen: Mutex<Vec<MethodCall>>,
}

impl ScriptedExecutor {
    /// Answers every call with `outcome`.
    pub fn always(outcome: Result<Value>) -> Arc<Self> {
        Self::scripted(Vec::new(), outcome)
    }

    /// Answers with `first` in order, then with `then` forever.
    pub fn scripted(first: Vec<Result<Value>>, then: Result<Value>) -> Arc<Self> {
        Self::build(addr(1), first, then, 0)
    }

    /// Reports `ObjectMigrating` to the first `failures` migration requests, then
    /// lands at the destination.
    pub fn migrating(failures: usize) -> Arc<Self> {
        Self::build(addr(1), Vec::new(), Ok(Value::Unit), failures)
    }

    fn build(
        address: HostAddress,
        first: Vec<Result<Value>>,
        then: Result<Value>,
        migrate_failures: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            object_id: ObjectId(1),
            address,
            script: Mutex::new(first.into()),
            fallback: then,
            migrate_failures,
            invokes: AtomicUsize::new(0),
            migrations: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn invoke_count(&self) -> usize {
        self.invokes.load(Ordering::SeqCst)
    }

    pub fn migrate_count(&self) -> usize {
        self.migrations.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ExecutorRef for ScriptedExecutor {
    fn object_id(&self) -> ObjectId {
        self.object_id
    }

    fn address(&self) -> &HostAddress {
        &self.address
    }

    async fn invoke(&self, call: &MethodCall) -> Result<Value> {
        self.invokes.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(call.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    async fn migrate_to(&self, destination: &HostAddress) -> Result<Arc<dyn ExecutorRef>> {
        let n = self.migrations.fetch_add(1, Ordering::SeqCst);
        if n < self.migrate_failures {
            return Err(CallError::ObjectMigrating);
        }
        let landed: Arc<dyn ExecutorRef> =
            Self::build(destination.clone(), Vec::new(), Ok(Value::Unit), 0);
        Ok(landed)
    }
}
