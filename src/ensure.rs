use crate::client::RemoteClient;
use crate::error::Result;
use crate::utils::directory_prefixes;

/// Creates every missing directory along `path`, outermost first.
///
/// How each step is carried out is up to the client: SFTP probes before
/// creating, FTP always attempts creation. Re-running is harmless either way.
pub async fn ensure_path(
    client: &mut dyn RemoteClient,
    path: &str,
    exclude_last_segment: bool,
) -> Result<()> {
    for dir in directory_prefixes(path, exclude_last_segment) {
        tracing::trace!(protocol = %client.protocol(), dir = %dir, "ensuring directory");
        client.ensure_directory(&dir).await?;
    }
    Ok(())
}
