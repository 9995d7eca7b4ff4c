/*!
 * SMB/CIFS network share backend
 */

use std::io::{Read, Write, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use crate::error::{OrbitError, Result};
use super::{StorageBackend, FileMetadata};

#[derive(Debug, Clone)]
pub struct SmbConfig {
    pub server: String,
    pub share: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
}

pub struct SmbBackend {
    config: SmbConfig,
    connection: Arc<Mutex<Option<SmbConnection>>>,
}

#[allow(dead_code)]
struct SmbConnection {
    server: String,
    share: String,
    authenticated: bool,
}

impl SmbBackend {
    pub fn new(
        server: String,
        share: String,
        username: Option<String>,
        password: Option<String>,
        domain: Option<String>,
    ) -> Result<Self> {
        let config = SmbConfig {
            server: server.clone(),
            share: share.clone(),
            username,
            password,
            domain,
        };
        
        let connection = SmbConnection::new(&server, &share)?;
        
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(Some(connection))),
        })
    }
    
    fn get_connection(&self) -> Result<()> {
        let mut conn = self.connection.lock()
            .map_err(|_| OrbitError::Config("Failed to acquire SMB connection lock".to_string()))?;
        
        if conn.is_none() {
            *conn = Some(SmbConnection::new(&self.config.server, &self.config.share)?);
        }
        
        if let Some(ref username) = self.config.username {
            if let Some(ref mut connection) = *conn {
                connection.authenticate(username, self.config.password.as_deref())?;
            }
        }
        
        Ok(())
    }
    
    fn build_smb_path(&self, path: &Path) -> String {
        format!("\\\\{}\\{}\\{}", 
            self.config.server,
            self.config.share,
            path.to_string_lossy().replace('/', "\\")
        )
    }
}

impl StorageBackend for SmbBackend {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        self.get_connection()?;
        let smb_path = self.build_smb_path(path);
        println!("SMB: Reading from {}", smb_path);
        
        Err(OrbitError::Config(
            format!("SMB read not yet implemented for {}", smb_path)
        ))
    }
    
    fn open_write(&self, path: &Path, _append: bool) -> Result<Box<dyn Write + Send>> {
        self.get_connection()?;
        let smb_path = self.build_smb_path(path);
        println!("SMB: Writing to {}", smb_path);
        
        Ok(Box::new(MockSmbWriter::new(smb_path)))
    }
    
    fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        self.get_connection()?;
        let smb_path = self.build_smb_path(path);
        println!("SMB: Getting metadata for {}", smb_path);
        
        Ok(FileMetadata {
            size: 0,
            is_file: true,
            is_dir: false,
            modified: None,
            permissions: None,
        })
    }
    
    fn exists(&self, path: &Path) -> Result<bool> {
        self.get_connection()?;
        let smb_path = self.build_smb_path(path);
        println!("SMB: Checking existence of {}", smb_path);
        Ok(false)
    }
    
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.get_connection()?;
        let smb_path = self.build_smb_path(path);
        println!("SMB: Creating directory {}", smb_path);
        Ok(())
    }
    
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.get_connection()?;
        let smb_path = self.build_smb_path(path);
        println!("SMB: Listing directory {}", smb_path);
        Ok(Vec::new())
    }
    
    fn remove_file(&self, path: &Path) -> Result<()> {
        self.get_connection()?;
        let smb_path = self.build_smb_path(path);
        println!("SMB: Removing file {}", smb_path);
        Ok(())
    }
    
    fn sync(&self, path: &Path) -> Result<()> {
        self.get_connection()?;
        let smb_path = self.build_smb_path(path);
        println!("SMB: Syncing {}", smb_path);
        Ok(())
    }
    
    fn protocol_name(&self) -> &'static str {
        "smb"
    }
}

impl SmbConnection {
    fn new(server: &str, share: &str) -> Result<Self> {
        println!("SMB: Connecting to \\\\{}\\{}", server, share);
        
        Ok(Self {
            server: server.to_string(),
            share: share.to_string(),
            authenticated: false,
        })
    }
    
    fn authenticate(&mut self, username: &str, _password: Option<&str>) -> Result<()> {
        println!("SMB: Authenticating as {}", username);
        self.authenticated = true;
        Ok(())
    }
}

struct MockSmbWriter {
    path: String,
    buffer: Cursor<Vec<u8>>,
}

impl MockSmbWriter {
    fn new(path: String) -> Self {
        Self {
            path,
            buffer: Cursor::new(Vec::new()),
        }
    }
}

impl Write for MockSmbWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        println!("SMB: Writing {} bytes to {}", buf.len(), self.path);
        self.buffer.write(buf)
    }
    
    fn flush(&mut self) -> std::io::Result<()> {
        println!("SMB: Flushing {}", self.path);
        self.buffer.flush()
    }
}
