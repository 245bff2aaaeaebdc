//! End-to-end lab lifecycle against a thin control-plane server
//!
//! Controllers are wired through the public API with in-memory adapters and a
//! real proxy; the server records what reaches it.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{Method, Uri};
use axum::Router;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tokio::time::sleep;

use lab_orchestrator::auth::LabInstanceClaims;
use lab_orchestrator::database::MemoryStore;
use lab_orchestrator::kubernetes::{get_registry, KubernetesConfig};
use lab_orchestrator::model::{
    DockerImage, Entity, Identifier, Lab, LabDockerImage, LabInstance, User,
};
use lab_orchestrator::{create_controller_collection, ControllerCollection, JwtTokenIssuer};

const SECRET: &str = "lab-secret";

/// Find an available port for testing
fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to address")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type Requests = Arc<Mutex<Vec<(Method, String)>>>;

async fn record(State(requests): State<Requests>, method: Method, uri: Uri) -> &'static str {
    requests
        .lock()
        .unwrap()
        .push((method, uri.path().to_string()));
    "kind: Status\n"
}

async fn start_control_plane() -> (u16, Requests) {
    let port = find_available_port();
    let requests = Requests::default();
    let app = Router::new().fallback(record).with_state(requests.clone());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .expect("Failed to bind control plane");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    sleep(Duration::from_millis(100)).await;

    (port, requests)
}

async fn controllers(port: u16) -> ControllerCollection {
    let port_value = port.to_string();
    let config = KubernetesConfig::development_from(|name| match name {
        "KUBERNETES_SERVICE_HOST" => Some("127.0.0.1".to_string()),
        "KUBERNETES_SERVICE_PORT" => Some(port_value.clone()),
        _ => None,
    })
    .unwrap();

    let users = Arc::new(MemoryStore::<User>::new());
    users.insert(User::new("alice").unwrap());

    create_controller_collection(
        get_registry(&config).unwrap(),
        users,
        Arc::new(MemoryStore::<DockerImage>::new()),
        Arc::new(MemoryStore::<Lab>::new()),
        Arc::new(MemoryStore::<LabDockerImage>::new()),
        Arc::new(MemoryStore::<LabInstance>::new()),
        Arc::new(JwtTokenIssuer::new()),
        SECRET,
    )
}

#[tokio::test]
async fn test_start_and_stop_lab() {
    init_tracing();
    let (port, requests) = start_control_plane().await;
    let c = controllers(port).await;

    let ubuntu = c
        .docker_images
        .create("ubuntu", "Ubuntu 22.04", "user/ubuntu:22.04")
        .await
        .unwrap();
    let arch = c
        .docker_images
        .create("arch", "Arch Linux", "user/arch:latest")
        .await
        .unwrap();
    let lab = c
        .labs
        .create("Networking", "net", "Two hosts")
        .await
        .unwrap();
    c.lab_docker_images
        .create(lab.id(), ubuntu.id(), "ubuntu")
        .await
        .unwrap();
    c.lab_docker_images
        .create(lab.id(), arch.id(), "arch")
        .await
        .unwrap();

    let result = c
        .lab_instances
        .create(lab.id(), &"alice".into())
        .await
        .unwrap();
    assert_eq!(result.allowed_vm_names, vec!["ubuntu", "arch"]);

    let namespace = format!("net-alice-{}", result.id);
    let vmis = format!(
        "/apis/kubevirt.io/v1alpha3/namespaces/{}/virtualmachineinstances/",
        namespace
    );
    let started: Vec<(Method, String)> = requests.lock().unwrap().clone();
    assert_eq!(
        started,
        vec![
            (Method::POST, "/api/v1/namespaces".to_string()),
            (
                Method::POST,
                format!(
                    "/apis/networking.k8s.io/v1/namespaces/{}/networkpolicies",
                    namespace
                )
            ),
            (Method::POST, vmis.clone()),
            (Method::POST, vmis),
        ]
    );

    let claims = decode::<LabInstanceClaims>(
        &result.access_token,
        &DecodingKey::from_secret(SECRET.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap()
    .claims;
    assert_eq!(claims.sub, Identifier::from("alice"));
    assert_eq!(claims.lab_instance.namespace, namespace);
    assert_eq!(claims.lab_instance.allowed_vm_names, vec!["ubuntu", "arch"]);

    let alice = User::new("alice").unwrap();
    let instances = c.lab_instances.list_by_user(&alice).await.unwrap();
    assert_eq!(instances.len(), 1);

    c.lab_instances.delete(&instances[0]).await.unwrap();

    let all = requests.lock().unwrap().clone();
    assert_eq!(all.len(), 5);
    assert_eq!(
        all[4],
        (Method::DELETE, format!("/api/v1/namespaces/{}", namespace))
    );
    assert!(c.lab_instances.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_user_touches_nothing() {
    init_tracing();
    let (port, requests) = start_control_plane().await;
    let c = controllers(port).await;
    let lab = c.labs.create("Empty", "empty", "No VMs").await.unwrap();

    let result = c.lab_instances.create(lab.id(), &"mallory".into()).await;

    assert!(result.is_err());
    assert!(requests.lock().unwrap().is_empty());
    assert!(c.lab_instances.get_all().await.unwrap().is_empty());
}
