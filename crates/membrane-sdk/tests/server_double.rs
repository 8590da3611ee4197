//! End-to-end exercises against an in-process websocket server double.
//!
//! The double accepts raw websocket connections and decides what each one
//! is by its first client message: a declaration marks the control channel,
//! a registration marks a worker stream. Worker streams are driven through
//! one request/response exchange and then closed cleanly.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use membrane_proto::{
    ClientContent, ClientMessage, CorrelationId, HttpRequest, RegistrationRequest,
    ResourceDeclaration, ServerContent, ServerMessage, TopicMessage,
};
use membrane_sdk::config::{RunMode, SdkConfig};
use membrane_sdk::handler::HandlerError;
use membrane_sdk::manager::Manager;
use membrane_sdk::resources::{Api, Topic};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

type ServerWs = WebSocketStream<TcpStream>;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug)]
enum Observed {
    Declared(ResourceDeclaration),
    Registered(RegistrationRequest),
    Responded(ClientMessage),
}

async fn recv_client(ws: &mut ServerWs) -> Option<ClientMessage> {
    while let Some(frame) = ws.next().await {
        match frame.expect("server-side read") {
            Message::Text(text) => {
                return Some(ClientMessage::from_json(&text).expect("decode client message"));
            }
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn send_server(ws: &mut ServerWs, msg: &ServerMessage) {
    ws.send(Message::Text(msg.to_json().expect("encode server message")))
        .await
        .expect("server-side send");
}

/// What the double pushes down a freshly registered worker stream.
fn work_for(registration: &RegistrationRequest) -> ServerMessage {
    let content = match registration {
        RegistrationRequest::ApiRoute { path, methods, .. } => ServerContent::HttpRequest {
            request: HttpRequest {
                method: methods.first().cloned().unwrap_or_else(|| "GET".to_string()),
                path: path.clone(),
                headers: std::collections::HashMap::new(),
                query_params: std::collections::HashMap::new(),
                path_params: std::collections::HashMap::new(),
                body: Vec::new(),
            },
        },
        RegistrationRequest::Subscription { topic } => ServerContent::TopicMessage {
            message: TopicMessage {
                topic: topic.clone(),
                payload: serde_json::json!({"n": 1}),
            },
        },
        other => panic!("double has no work for {other:?}"),
    };
    ServerMessage {
        id: CorrelationId::new(),
        content,
    }
}

async fn serve_connection(stream: TcpStream, events: mpsc::UnboundedSender<Observed>) {
    let mut ws = tokio_tungstenite::accept_async(stream)
        .await
        .expect("websocket handshake");

    while let Some(msg) = recv_client(&mut ws).await {
        match msg.content {
            ClientContent::Declaration { declaration } => {
                let identifier = declaration.identifier();
                let _ = events.send(Observed::Declared(declaration));
                send_server(&mut ws, &ServerMessage::declaration_ack(msg.id, identifier)).await;
            }
            ClientContent::Registration { registration } => {
                send_server(&mut ws, &ServerMessage::registration_ack(msg.id)).await;
                send_server(&mut ws, &work_for(&registration)).await;
                let _ = events.send(Observed::Registered(registration));
                if let Some(reply) = recv_client(&mut ws).await {
                    let _ = events.send(Observed::Responded(reply));
                }
                let _ = ws.close(None).await;
                return;
            }
            other => panic!("unexpected client message: {other:?}"),
        }
    }
}

async fn start_double() -> (SocketAddr, mpsc::UnboundedReceiver<Observed>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind double");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(serve_connection(stream, tx.clone()));
        }
    });
    (addr, rx)
}

fn leaked_manager(addr: SocketAddr, mode: RunMode) -> &'static Manager {
    let config = SdkConfig::new(format!("ws://{addr}"))
        .expect("config")
        .with_mode(mode);
    Box::leak(Box::new(Manager::new(config)))
}

#[tokio::test]
async fn test_api_route_serves_one_request() {
    init_tracing();
    let (addr, mut events) = start_double().await;
    let manager = leaked_manager(addr, RunMode::Run);

    let api = Api::with_manager(manager, "main").await.expect("declare api");
    api.get("/hello", |ctx| {
        ctx.set_status(201);
        ctx.set_body(b"hi".to_vec());
        Ok(())
    });

    manager
        .run(CancellationToken::new())
        .await
        .expect("clean run");

    let mut declared = Vec::new();
    let mut registered = Vec::new();
    let mut responses = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            Observed::Declared(d) => declared.push(d),
            Observed::Registered(r) => registered.push(r),
            Observed::Responded(c) => responses.push(c),
        }
    }

    assert_eq!(
        declared,
        vec![ResourceDeclaration::Api {
            name: "main".to_string()
        }]
    );
    assert_eq!(
        registered,
        vec![RegistrationRequest::ApiRoute {
            api: "main".to_string(),
            path: "/hello".to_string(),
            methods: vec!["GET".to_string()],
        }]
    );
    assert_eq!(responses.len(), 1);
    match &responses[0].content {
        ClientContent::HttpResponse { response } => {
            assert_eq!(response.status, 201);
            assert_eq!(response.body, b"hi");
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn test_handler_failure_surfaces_in_http_response() {
    init_tracing();
    let (addr, mut events) = start_double().await;
    let manager = leaked_manager(addr, RunMode::Run);

    let api = Api::with_manager(manager, "main").await.expect("declare api");
    api.get("/broken", |_ctx| Err(HandlerError::failed("kaput")));

    // Handler errors are captured into the response, not the run result.
    manager
        .run(CancellationToken::new())
        .await
        .expect("clean run");

    let response = loop {
        match events.try_recv() {
            Ok(Observed::Responded(c)) => break c,
            Ok(_) => {}
            Err(e) => panic!("no response observed: {e}"),
        }
    };
    match response.content {
        ClientContent::HttpResponse { response } => {
            assert_eq!(response.status, 500);
            assert!(String::from_utf8(response.body).unwrap().contains("kaput"));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn test_topic_subscription_and_publish_policy() {
    init_tracing();
    let (addr, mut events) = start_double().await;
    let manager = leaked_manager(addr, RunMode::Run);

    let topic = Topic::with_manager(manager, "orders")
        .await
        .expect("declare topic");
    topic.allow_publish().await.expect("declare policy");
    topic.subscribe(|ctx| {
        assert_eq!(ctx.topic(), "orders");
        Ok(())
    });

    manager
        .run(CancellationToken::new())
        .await
        .expect("clean run");

    let mut declared = Vec::new();
    let mut responses = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            Observed::Declared(d) => declared.push(d),
            Observed::Responded(c) => responses.push(c),
            Observed::Registered(_) => {}
        }
    }

    assert_eq!(declared.len(), 2);
    assert!(matches!(&declared[0], ResourceDeclaration::Topic { name } if name == "orders"));
    assert!(matches!(&declared[1], ResourceDeclaration::Policy { .. }));

    assert_eq!(responses.len(), 1);
    match &responses[0].content {
        ClientContent::TopicResponse { response } => assert!(response.success),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn test_two_workers_run_concurrently() {
    init_tracing();
    let (addr, mut events) = start_double().await;
    let manager = leaked_manager(addr, RunMode::Run);

    let api = Api::with_manager(manager, "main").await.expect("declare api");
    api.get("/a", |ctx| {
        ctx.set_status(200);
        Ok(())
    });
    api.post("/b", |ctx| {
        ctx.set_status(200);
        Ok(())
    });

    manager
        .run(CancellationToken::new())
        .await
        .expect("clean run");

    let responded = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e, Observed::Responded(_)))
        .count();
    assert_eq!(responded, 2);
}
