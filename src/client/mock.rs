use super::{Protocol, RemoteClient, RemoteEntry};
use crate::error::Result;
use async_trait::async_trait;
use mockall::mock;

mock! {
    pub TestClient {}

    #[async_trait]
    impl RemoteClient for TestClient {
        fn protocol(&self) -> Protocol;
        async fn store(&mut self, path: &str, data: Vec<u8>) -> Result<()>;
        async fn list_entries(&mut self, path: &str) -> Result<Vec<RemoteEntry>>;
        async fn stat(&mut self, path: &str) -> Result<()>;
        async fn make_directory(&mut self, path: &str) -> Result<()>;
        async fn delete_file(&mut self, path: &str) -> Result<()>;
        async fn remove_directory(&mut self, path: &str) -> Result<()>;
        async fn disconnect(&mut self) -> Result<()>;
        async fn ensure_directory(&mut self, path: &str) -> Result<()>;
        async fn finish_upload(&mut self, path: &str) -> Result<()>;
    }
}
