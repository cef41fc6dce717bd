use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    sync::mpsc,
    thread,
};

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};

use crate::errors::PitwallError;
use crate::live::EventView;

/// One line of a recording: a published view and when it was seen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedView {
    pub recorded_at: DateTime<Utc>,
    pub view: EventView,
}

/// Append every view published on `views` to `file` as JSON Lines until the view
/// shuts down. The file is written from its own thread, this task only serializes.
pub async fn write_recording(
    file: &Path,
    mut views: watch::Receiver<EventView>,
) -> Result<usize, PitwallError> {
    let (line_tx, line_rx) = mpsc::channel::<String>();
    let (done_tx, done_rx) = oneshot::channel();
    let path = file.to_path_buf();
    thread::spawn(move || {
        let _ = done_tx.send(write_lines(&path, line_rx));
    });

    loop {
        let line = RecordedView {
            recorded_at: Utc::now(),
            view: views.borrow_and_update().clone(),
        };
        match serde_json::to_string(&line) {
            Ok(json) => {
                // the writer thread only hangs up after an I/O error
                if line_tx.send(json).is_err() {
                    break;
                }
            }
            Err(e) => error!("Error while serializing view snapshot: {}", e),
        }
        if views.changed().await.is_err() {
            break;
        }
    }
    drop(line_tx);

    done_rx.await.unwrap_or_else(|_| {
        Err(PitwallError::WriterError {
            source: io::Error::other("recording writer thread stopped unexpectedly"),
        })
    })
}

fn write_lines(file: &Path, lines: mpsc::Receiver<String>) -> Result<usize, PitwallError> {
    let recording_file = File::create(file).map_err(|e| PitwallError::WriterError { source: e })?;
    let mut recording_writer = BufWriter::new(recording_file);
    let mut written = 0;

    for json in lines {
        writeln!(recording_writer, "{}", json)
            .map_err(|e| PitwallError::WriterError { source: e })?;
        written += 1;
    }

    recording_writer
        .flush()
        .map_err(|e| PitwallError::WriterError { source: e })?;
    info!("Wrote {} snapshots to {}", written, file.display());
    Ok(written)
}

pub fn load_recording(source_file: &Path) -> Result<Vec<RecordedView>, PitwallError> {
    serde_jsonlines::json_lines(source_file)
        .map_err(|e| PitwallError::RecordingLoaderError { source: e })?
        .collect::<Result<Vec<RecordedView>, std::io::Error>>()
        .map_err(|e| PitwallError::RecordingLoaderError { source: e })
}
