use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// 圖片輸出目錄管理
#[derive(Debug, Clone)]
pub struct FileManager {
    output_dir: PathBuf,
}

impl FileManager {
    /// 建立檔案管理器，目錄不存在時自動建立
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("無法建立輸出目錄 {}", output_dir.display()))?;

        Ok(Self { output_dir })
    }

    /// 取得圖片儲存路徑
    pub fn image_path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }

    /// 開啟圖片檔準備寫入（覆寫同名檔案）
    pub async fn create_image(&self, filename: &str) -> std::io::Result<ImageWriter> {
        let path = self.image_path(filename);
        let file = File::create(&path).await?;

        Ok(ImageWriter {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }
}

/// 串流寫入單張圖片，記錄實際寫入的位元組數
pub struct ImageWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl ImageWriter {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// 寫完並 flush，回傳路徑與總位元組數；失敗時刪除檔案
    pub async fn finish(mut self) -> std::io::Result<(PathBuf, u64)> {
        match self.flush_and_sync().await {
            Ok(()) => Ok((self.path, self.written)),
            Err(e) => {
                self.discard().await;
                Err(e)
            }
        }
    }

    async fn flush_and_sync(&mut self) -> std::io::Result<()> {
        self.writer.flush().await?;
        self.writer.get_ref().sync_all().await
    }

    /// 寫入失敗時刪除不完整的檔案
    pub async fn discard(self) {
        let ImageWriter { path, writer, .. } = self;
        drop(writer);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::debug!("無法刪除不完整檔案 {}: {}", path.display(), e);
        }
    }
}
