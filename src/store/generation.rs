// Named key-to-response store. One directory per generation; each entry
// is a body file plus a JSON metadata sidecar.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::http::ProxyResponse;

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    method: String,
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
}

/// A single named cache generation, created lazily on first open and
/// persistent until explicitly deleted.
#[derive(Debug, Clone)]
pub struct CacheGeneration {
    name: String,
    dir: PathBuf,
}

impl CacheGeneration {
    pub(crate) fn open(root: &Path, name: &str) -> Result<Self> {
        let dir = root.join(name);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            name: name.to_string(),
            dir,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn entry_key(method: &str, url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(b" ");
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Store a response under `method` + `url`, overwriting any previous
    /// entry. The body lands first and the metadata sidecar last, each
    /// through a temp-file rename, so an entry is visible only once it is
    /// complete and same-key races settle last-write-wins.
    pub fn put(&self, method: &str, url: &str, response: &ProxyResponse) -> Result<()> {
        let key = Self::entry_key(method, url);
        let meta = EntryMeta {
            method: method.to_string(),
            url: url.to_string(),
            status: response.status,
            headers: response.headers.clone(),
        };
        write_atomic(&self.dir.join(format!("{key}.bin")), &response.body)?;
        write_atomic(
            &self.dir.join(format!("{key}.json")),
            &serde_json::to_vec(&meta)?,
        )?;
        debug!("cache put generation={} url={}", self.name, url);
        Ok(())
    }

    /// Look up a previously stored response.
    pub fn lookup(&self, method: &str, url: &str) -> Result<Option<ProxyResponse>> {
        let key = Self::entry_key(method, url);
        let meta_path = self.dir.join(format!("{key}.json"));
        if !meta_path.exists() {
            return Ok(None);
        }
        let meta: EntryMeta = serde_json::from_slice(&fs::read(&meta_path)?)?;
        let body = fs::read(self.dir.join(format!("{key}.bin")))?;
        Ok(Some(ProxyResponse {
            status: meta.status,
            headers: meta.headers,
            body: Bytes::from(body),
        }))
    }

    /// Number of committed entries.
    pub fn len(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
