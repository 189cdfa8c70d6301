use {
    super::{RecordSink, async_trait},
    crate::{FoundBlock, Result, Share},
    serde::Serialize,
    std::path::PathBuf,
    tokio::{
        fs::OpenOptions,
        io::{AsyncWriteExt, BufWriter},
        sync::Mutex,
    },
};

/// Append-only JSON-lines sink. Each record is tagged with its type so shares
/// and found blocks can share one file.
pub struct FileSink {
    writer: Mutex<BufWriter<tokio::fs::File>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    Share(&'a Share),
    Found(&'a FoundBlock),
}

impl FileSink {
    pub async fn new(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    async fn write_record(&self, record: Record<'_>) -> Result<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl RecordSink for FileSink {
    async fn insert_shares(&self, shares: Vec<Share>) -> Result<()> {
        for share in &shares {
            self.write_record(Record::Share(share)).await?;
        }
        Ok(())
    }

    async fn insert_found(&self, block: FoundBlock) -> Result<()> {
        self.write_record(Record::Found(&block)).await
    }
}
