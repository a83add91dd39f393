// src/remote/testing.rs
//
// Backend falso para os testes: um Router do axum numa porta local.

use axum::Router;
use tokio::net::TcpListener;

/// Sobe `router` em 127.0.0.1 numa porta livre e devolve a URL base.
pub async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Cliente sem proxy do sistema, para não desviar as chamadas locais.
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
