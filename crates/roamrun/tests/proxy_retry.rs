mod common;

use std::time::Duration;

use roamrpc::AppError;
use roamrpc::CallError;
use roamrpc::MethodCall;
use roamrpc::Value;

use roamrun::ExecutorRef;
use roamrun::RetryPolicy;
use roamrun::RuntimeConfig;
use roamrun::config::ENV_BASE_DELAY_MS;
use roamrun::config::ENV_MAX_ATTEMPTS;
use roamrun::proxy::MIGRATE_SIGNATURE;

use common::ScriptedExecutor;
use common::TO_STRING;
use common::addr;
use common::proxy_with_hosts;

fn to_string() -> MethodCall {
    MethodCall::nullary(TO_STRING)
}

fn migrate_call(args: Vec<Value>) -> MethodCall {
    MethodCall::new(MIGRATE_SIGNATURE, args)
}

#[tokio::test]
async fn regular_call_is_sent_once() {
    common::setup();
    let target = ScriptedExecutor::always(Ok(Value::from("Hello")));
    let proxy = proxy_with_hosts(target.clone(), &[addr(1), addr(2)]);

    let reply = proxy.invoke(&to_string()).await;

    assert_eq!(reply, Ok(Value::from("Hello")));
    assert_eq!(target.invoke_count(), 1);
    assert_eq!(target.migrate_count(), 0);
    assert_eq!(target.calls(), vec![to_string()]);
}

#[tokio::test(start_paused = true)]
async fn migrating_object_is_retried_seven_times() {
    common::setup();
    let target = ScriptedExecutor::always(Err(CallError::ObjectMigrating));
    let proxy = proxy_with_hosts(target.clone(), &[addr(1), addr(2)]);

    let reply = proxy.invoke(&to_string()).await;

    assert_eq!(reply, Err(CallError::ObjectMigrating));
    assert_eq!(target.invoke_count(), 7);
    assert_eq!(target.migrate_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn retries_stop_once_migration_finishes() {
    let target = ScriptedExecutor::scripted(
        vec![Err(CallError::ObjectMigrating), Err(CallError::ObjectMigrating)],
        Ok(Value::from("Hello")),
    );
    let proxy = proxy_with_hosts(target.clone(), &[addr(1), addr(2)]);

    let reply = proxy.invoke(&to_string()).await;

    assert_eq!(reply, Ok(Value::from("Hello")));
    assert_eq!(target.invoke_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn backoff_waits_between_attempts() {
    let target = ScriptedExecutor::scripted(
        vec![Err(CallError::ObjectMigrating), Err(CallError::ObjectMigrating)],
        Ok(Value::Unit),
    );
    let proxy = proxy_with_hosts(target.clone(), &[addr(1)]);

    let started = tokio::time::Instant::now();
    proxy.invoke(&to_string()).await.unwrap();

    // 20ms before the second attempt, 40ms before the third
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(60), "waited {:?}", waited);
    assert!(waited < Duration::from_millis(70), "waited {:?}", waited);
}

#[tokio::test]
async fn application_failures_are_not_retried() {
    let failure = CallError::App(AppError::new("IllegalStateException", "list is closed"));
    let target = ScriptedExecutor::always(Err(failure.clone()));
    let proxy = proxy_with_hosts(target.clone(), &[addr(1)]);

    assert_eq!(proxy.invoke(&to_string()).await, Err(failure));
    assert_eq!(target.invoke_count(), 1);
}

#[tokio::test]
async fn custom_policy_bounds_attempts() {
    let target = ScriptedExecutor::always(Err(CallError::ObjectMigrating));
    let proxy = proxy_with_hosts(target.clone(), &[addr(1)])
        .with_policy(RetryPolicy::immediate().with_max_attempts(3));

    assert_eq!(proxy.invoke(&to_string()).await, Err(CallError::ObjectMigrating));
    assert_eq!(target.invoke_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn proxy_honours_loaded_config() {
    let config = RuntimeConfig::from_lookup(|var| match var {
        ENV_MAX_ATTEMPTS => Some("3".to_string()),
        ENV_BASE_DELAY_MS => Some("1".to_string()),
        _ => None,
    })
    .unwrap();
    let target = ScriptedExecutor::always(Err(CallError::ObjectMigrating));
    let proxy = proxy_with_hosts(target.clone(), &[addr(1)]).with_config(&config);

    assert_eq!(proxy.policy(), &config.retry);
    assert_eq!(proxy.invoke(&to_string()).await, Err(CallError::ObjectMigrating));
    assert_eq!(target.invoke_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn abandoning_a_call_stops_its_retries() {
    let target = ScriptedExecutor::always(Err(CallError::ObjectMigrating));
    let proxy = proxy_with_hosts(target.clone(), &[addr(1)]);

    // attempts at 0ms and 20ms; the third would be at 60ms
    let outcome = tokio::time::timeout(Duration::from_millis(50), proxy.invoke(&to_string())).await;

    assert!(outcome.is_err());
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(target.invoke_count(), 2);
}

#[tokio::test]
async fn unknown_destination_is_rejected_without_any_request() {
    common::setup();
    let target = ScriptedExecutor::always(Ok(Value::Unit));
    let proxy = proxy_with_hosts(target.clone(), &[addr(1), addr(2), addr(3)]);

    let result = proxy.migrate(&addr(4)).await;

    assert_eq!(result, Err(CallError::DestinationNotFound { address: addr(4) }));
    assert_eq!(target.invoke_count(), 0);
    assert_eq!(target.migrate_count(), 0);
    assert_eq!(proxy.target().address(), &addr(1));
}

#[tokio::test]
async fn migration_repoints_the_proxy() {
    let target = ScriptedExecutor::migrating(0);
    let proxy = proxy_with_hosts(target.clone(), &[addr(1), addr(2)]);

    proxy.migrate(&addr(2)).await.unwrap();

    assert_eq!(target.migrate_count(), 1);
    assert_eq!(proxy.target().address(), &addr(2));
    assert_eq!(proxy.object_id(), target.object_id());
}

#[tokio::test(start_paused = true)]
async fn migration_backs_off_while_source_is_busy() {
    let target = ScriptedExecutor::migrating(2);
    let proxy = proxy_with_hosts(target.clone(), &[addr(1), addr(2)]);

    proxy.migrate(&addr(2)).await.unwrap();

    assert_eq!(target.migrate_count(), 3);
    assert_eq!(proxy.target().address(), &addr(2));
}

#[tokio::test(start_paused = true)]
async fn migration_gives_up_after_seven_attempts() {
    let target = ScriptedExecutor::migrating(usize::MAX);
    let proxy = proxy_with_hosts(target.clone(), &[addr(1), addr(2)]);

    assert_eq!(proxy.migrate(&addr(2)).await, Err(CallError::ObjectMigrating));
    assert_eq!(target.migrate_count(), 7);
    assert_eq!(target.invoke_count(), 0);
    assert_eq!(proxy.target().address(), &addr(1));
}

#[tokio::test]
async fn migrate_signature_routes_to_migration() {
    let target = ScriptedExecutor::migrating(0);
    let proxy = proxy_with_hosts(target.clone(), &[addr(1), addr(2)]);

    let reply = proxy.invoke(&migrate_call(vec![Value::Address(addr(2))])).await;

    assert_eq!(reply, Ok(Value::Address(addr(2))));
    assert_eq!(target.invoke_count(), 0);
    assert_eq!(target.migrate_count(), 1);
    assert_eq!(proxy.target().address(), &addr(2));
}

#[tokio::test]
async fn migrate_signature_checks_destination_first() {
    let target = ScriptedExecutor::migrating(0);
    let proxy = proxy_with_hosts(target.clone(), &[addr(1), addr(2), addr(3)]);

    let reply = proxy.invoke(&migrate_call(vec![Value::Address(addr(4))])).await;

    assert_eq!(reply, Err(CallError::DestinationNotFound { address: addr(4) }));
    assert_eq!(target.migrate_count(), 0);
}

#[tokio::test]
async fn migrate_signature_rejects_malformed_arguments() {
    let target = ScriptedExecutor::migrating(0);
    let proxy = proxy_with_hosts(target.clone(), &[addr(1), addr(2)]);

    let none = proxy.invoke(&migrate_call(vec![])).await;
    let wrong = proxy.invoke(&migrate_call(vec![Value::from("127.0.0.2:22346")])).await;

    assert!(matches!(none, Err(CallError::BadArguments(_))));
    assert!(matches!(wrong, Err(CallError::BadArguments(_))));
    assert_eq!(target.invoke_count(), 0);
    assert_eq!(target.migrate_count(), 0);
}

#[tokio::test]
async fn clones_follow_the_object() {
    let target = ScriptedExecutor::migrating(0);
    let proxy = proxy_with_hosts(target.clone(), &[addr(1), addr(2)]);
    let copy = proxy.clone();

    proxy.migrate(&addr(2)).await.unwrap();

    assert_eq!(copy.target().address(), &addr(2));
    assert_eq!(copy.object_id(), target.object_id());
    assert_eq!(target.migrate_count(), 1);
}
