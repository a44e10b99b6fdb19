//! Tests for the call vocabulary.

use std::collections::HashMap;

use crate::AddressParseError;
use crate::AppError;
use crate::CallError;
use crate::Frame;
use crate::HostAddress;
use crate::MethodCall;
use crate::ObjectId;
use crate::Outcome;
use crate::Signature;
use crate::Transport;
use crate::TransportError;
use crate::Value;

const TO_STRING: &str = "public java.lang.String java.lang.Object.toString()";

#[test]
fn signature_equality_is_structural() {
    let a = Signature::new(TO_STRING);
    let b = Signature::from(TO_STRING.to_string());
    assert_eq!(a, b);
    assert_ne!(a, Signature::new("public int java.lang.Object.hashCode()"));

    // usable as a str-keyed map key
    let mut table = HashMap::new();
    table.insert(a, 1);
    assert_eq!(table.get(TO_STRING), Some(&1));
}

#[test]
fn method_call_equality_covers_args() {
    let a = MethodCall::new(TO_STRING, vec![Value::Int(1)]);
    let b = MethodCall::new(TO_STRING, vec![Value::Int(1)]);
    let c = MethodCall::new(TO_STRING, vec![Value::Int(2)]);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(MethodCall::nullary(TO_STRING).args().is_empty());
}

#[test]
fn host_address_parses_and_displays() {
    let addr: HostAddress = "10.0.0.1:22346".parse().expect("valid address");
    assert_eq!(addr, HostAddress::new("10.0.0.1", 22346));
    assert_eq!(addr.to_string(), "10.0.0.1:22346");

    let v6: HostAddress = "[::1]:8080".parse().expect("valid v6 address");
    assert_eq!(v6.host(), "[::1]");
    assert_eq!(v6.port(), 8080);
}

#[test]
fn host_address_rejects_malformed_input() {
    assert!(matches!("localhost".parse::<HostAddress>(), Err(AddressParseError::MissingPort(_))));
    assert!(matches!(":80".parse::<HostAddress>(), Err(AddressParseError::EmptyHost(_))));
    assert!(matches!("h:99999".parse::<HostAddress>(), Err(AddressParseError::InvalidPort(_))));
}

#[test]
fn only_migrating_is_retryable() {
    assert!(CallError::ObjectMigrating.is_retryable());

    let permanent = [
        CallError::DestinationNotFound { address: HostAddress::new("h", 1) },
        CallError::MethodNotFound(Signature::new(TO_STRING)),
        CallError::BadArguments("x".into()),
        CallError::ObjectNotFound(ObjectId(3)),
        CallError::TransferFailed("x".into()),
        CallError::Transport(TransportError::ConnectionLost("x".into())),
        CallError::Protocol("x".into()),
        CallError::App(AppError::new("Boom", "x")),
    ];
    for e in permanent {
        assert!(!e.is_retryable(), "{} must not be retryable", e);
    }
}

#[test]
fn destination_not_found_carries_address() {
    let addr = HostAddress::new("127.0.0.4", 22346);
    let e = CallError::DestinationNotFound { address: addr.clone() };
    let CallError::DestinationNotFound { address } = &e else {
        panic!("wrong variant");
    };
    assert_eq!(address, &addr);
    assert!(e.to_string().contains("127.0.0.4:22346"));
}

#[test]
fn outcome_pairing_is_checked() {
    let addr = HostAddress::new("h", 1);
    assert_eq!(Outcome::Returned(Value::Unit).into_value(), Ok(Value::Unit));
    assert_eq!(Outcome::Relocated(addr.clone()).into_relocation(), Ok(addr.clone()));
    assert!(matches!(
        Outcome::Relocated(addr).into_value(),
        Err(CallError::Protocol(_))
    ));
    assert!(matches!(
        Outcome::Returned(Value::Int(1)).into_relocation(),
        Err(CallError::Protocol(_))
    ));
    assert_eq!(
        Outcome::Failed(CallError::ObjectMigrating).into_value(),
        Err(CallError::ObjectMigrating)
    );
}

/// Transport that answers every call with its own argument list.
struct EchoTransport;

#[async_trait::async_trait]
impl Transport for EchoTransport {
    async fn call(&self, frame: Frame) -> crate::transport::Result<Frame> {
        match frame {
            Frame::Call { seq, call, .. } => {
                Ok(Frame::reply(seq, Outcome::Returned(Value::List(call.args().to_vec()))))
            }
            other => Err(TransportError::ConnectionLost(format!("unexpected {} frame", other.kind()))),
        }
    }
}

#[tokio::test]
async fn transport_is_object_safe() {
    let transport: std::sync::Arc<dyn Transport> = std::sync::Arc::new(EchoTransport);
    let call = MethodCall::new(TO_STRING, vec![Value::from("ping")]);
    let reply = transport
        .call(Frame::Call { seq: 9, object: ObjectId(1), call })
        .await
        .expect("echo reply");
    assert_eq!(reply.seq(), 9);
    let Frame::Reply { outcome, .. } = reply else {
        panic!("expected a reply frame");
    };
    assert_eq!(outcome.into_value(), Ok(Value::List(vec![Value::from("ping")])));
}
