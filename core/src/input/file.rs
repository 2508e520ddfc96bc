//! Reads a subchannel's logical frames from a raw file, looping back to
//! the start on EOF so a short test clip can feed the multiplexer
//! indefinitely.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

use super::{ReaderError, ReaderState, SubchannelReader};

pub struct FileReader {
    subchid: u8,
    path: PathBuf,
    file: Option<File>,
    state: ReaderState,
}

impl FileReader {
    pub fn new(subchid: u8, path: impl Into<PathBuf>) -> Self {
        Self {
            subchid,
            path: path.into(),
            file: None,
            state: ReaderState::Idle,
        }
    }
}

#[async_trait]
impl SubchannelReader for FileReader {
    fn subchid(&self) -> u8 {
        self.subchid
    }

    fn state(&self) -> ReaderState {
        self.state
    }

    async fn open(&mut self) -> Result<(), ReaderError> {
        let file = File::open(&self.path)
            .await
            .map_err(|source| ReaderError::Fault {
                subchid: self.subchid,
                source,
            })?;
        self.file = Some(file);
        self.state = ReaderState::Active;
        Ok(())
    }

    async fn read_logical_frame(&mut self, frame_len: usize) -> Result<Option<Vec<u8>>, ReaderError> {
        let Some(file) = self.file.as_mut() else {
            return Err(ReaderError::Underrun {
                subchid: self.subchid,
            });
        };

        let mut buf = vec![0u8; frame_len];
        let mut filled = 0;
        while filled < frame_len {
            let n = file
                .read(&mut buf[filled..])
                .await
                .map_err(|source| ReaderError::Fault {
                    subchid: self.subchid,
                    source,
                })?;
            if n == 0 {
                // EOF: loop back to the start and keep filling.
                file.seek(SeekFrom::Start(0))
                    .await
                    .map_err(|source| ReaderError::Fault {
                        subchid: self.subchid,
                        source,
                    })?;
                continue;
            }
            filled += n;
        }

        Ok(Some(buf))
    }

    async fn close(&mut self) {
        self.file = None;
        self.state = ReaderState::Closed;
    }
}
