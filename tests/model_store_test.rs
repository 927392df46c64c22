use sha2::{Digest, Sha256};
use spamsift::{ClassifierBuilder, ModelStore, StoreError};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves `files` over plain HTTP on a random local port; unknown paths get a 404.
async fn serve(files: HashMap<&'static str, Vec<u8>>) -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let files = Arc::new(files);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let files = Arc::clone(&files);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/");

                let (status, body) = match files.get(path) {
                    Some(body) => ("200 OK", body.clone()),
                    None => ("404 Not Found", Vec::new()),
                };
                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    Ok(base_url)
}

const SERVED_MANIFEST: &str = r#"{
    "name": "served",
    "backend": {
        "kind": "onnx",
        "model_file": "model.onnx",
        "tokenizer_file": "tokenizer.json",
        "tokenizer_sha256": "TOKENIZER_HASH",
        "capability": {"kind": "probabilities", "output": "probabilities"}
    }
}"#;

fn served_files(tokenizer_hash: &str) -> HashMap<&'static str, Vec<u8>> {
    HashMap::from([
        ("/spam/manifest.json", SERVED_MANIFEST.replace("TOKENIZER_HASH", tokenizer_hash).into_bytes()),
        ("/spam/model.onnx", b"model weights".to_vec()),
        ("/spam/tokenizer.json", b"{}".to_vec()),
    ])
}

#[test]
fn test_store_paths() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path().join("nested").join("models"))?;

    assert!(store.models_dir().exists());
    assert!(store.manifest_path().ends_with("models/manifest.json"));
    assert!(!store.is_artifact_present());
    Ok(())
}

#[test]
fn test_stored_keyword_artifact_loads() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path())?;
    fs::write(
        store.manifest_path(),
        r#"{"name": "stored", "backend": {"kind": "keywords", "keywords": ["prize"]}}"#,
    )?;

    assert!(store.is_artifact_present());
    assert!(store.verify_artifact()?);

    let classifier = ClassifierBuilder::new()
        .with_artifact(store.manifest_path())?
        .build()?;
    assert_eq!(classifier.name(), "stored");
    assert_eq!(classifier.capability(), "label-only");
    Ok(())
}

#[test]
fn test_missing_referenced_file_fails_verification() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path())?;
    fs::write(
        store.manifest_path(),
        r#"{
            "name": "partial",
            "backend": {
                "kind": "onnx",
                "model_file": "model.onnx",
                "tokenizer_file": "tokenizer.json",
                "capability": {"kind": "probabilities", "output": "probabilities"}
            }
        }"#,
    )?;
    fs::write(dir.path().join("model.onnx"), b"weights")?;

    assert!(!store.verify_artifact()?);
    Ok(())
}

#[test]
fn test_invalid_manifest_reported() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path())?;
    fs::write(store.manifest_path(), "[]")?;

    assert!(matches!(store.verify_artifact(), Err(StoreError::InvalidManifest(_))));
    Ok(())
}

#[test]
fn test_download_rejects_bad_url() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path())?;

    let result = tokio_test::block_on(store.download_artifact("not a url"));
    assert!(matches!(result, Err(StoreError::DownloadError(_))));
    assert!(!store.is_artifact_present());
    Ok(())
}

#[tokio::test]
async fn test_download_complete_artifact() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = serve(served_files(&format!("{:x}", Sha256::digest(b"{}")))).await?;
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path())?;

    store.download_artifact(&format!("{}/spam/", base_url)).await?;
    assert!(store.is_artifact_present());
    assert!(store.verify_artifact()?);
    assert_eq!(fs::read(dir.path().join("model.onnx"))?, b"model weights");
    Ok(())
}

#[tokio::test]
async fn test_failed_download_leaves_store_empty() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = serve(served_files("00")).await?;
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path())?;

    let result = store.download_artifact(&format!("{}/spam", base_url)).await;
    assert!(matches!(result, Err(StoreError::HashMismatch { .. })));
    assert!(!store.is_artifact_present());
    assert_eq!(fs::read_dir(store.models_dir())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_remote_file_leaves_store_empty() -> Result<(), Box<dyn std::error::Error>> {
    let mut files = served_files("00");
    files.remove("/spam/tokenizer.json");
    let base_url = serve(files).await?;
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path())?;

    let result = store.download_artifact(&format!("{}/spam", base_url)).await;
    assert!(matches!(result, Err(StoreError::DownloadError(_))));
    assert_eq!(fs::read_dir(store.models_dir())?.count(), 0);
    Ok(())
}
