//! XMLTV serialization of the combined guide
//!
//! Streams the document to a sibling temp file and renames it into place, so
//! an interrupted or failed run never clobbers the previously published
//! guide. Channels are written first, then programmes, matching what IPTV
//! clients expect from an XMLTV feed.

use chrono::Utc;
use quick_xml::escape::escape;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

use crate::errors::AppError;
use crate::models::CombinedGuide;

pub struct XmltvGenerator {
    generator_name: String,
}

impl Default for XmltvGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl XmltvGenerator {
    pub fn new() -> Self {
        Self {
            generator_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    /// Write the combined guide to `path`, returning the bytes written.
    ///
    /// The document is streamed to `<path>.tmp` and atomically renamed over
    /// the output path once complete.
    pub async fn write_guide(&self, guide: &CombinedGuide, path: &Path) -> Result<u64, AppError> {
        let display_path = path.display().to_string();
        let write_err = |e: std::io::Error| AppError::write(display_path.as_str(), e.to_string());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
            }
        }

        let temp_path = temp_sibling(path);
        let file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        let mut bytes_written = 0u64;

        let header = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE tv SYSTEM \"xmltv.dtd\">\n\
             <tv generator-info-name=\"{}\" date=\"{}\">\n",
            escape(&self.generator_name),
            Utc::now().format("%Y%m%d%H%M%S")
        );
        writer
            .write_all(header.as_bytes())
            .await
            .map_err(write_err)?;
        bytes_written += header.len() as u64;

        for channel in &guide.channels {
            let mut channel_line = format!("  <channel id=\"{}\">\n", escape(&channel.channel_id));
            channel_line.push_str(&format!(
                "    <display-name>{}</display-name>\n",
                escape(&channel.channel_name)
            ));

            if let Some(ref logo) = channel.channel_logo {
                if !logo.is_empty() {
                    channel_line.push_str(&format!("    <icon src=\"{}\"/>\n", escape(logo)));
                }
            }

            channel_line.push_str("  </channel>\n");

            writer
                .write_all(channel_line.as_bytes())
                .await
                .map_err(write_err)?;
            bytes_written += channel_line.len() as u64;
        }

        for program in &guide.programs {
            // raw start/stop strings pass through exactly as the source sent them
            let mut program_line = format!(
                "  <programme start=\"{}\" stop=\"{}\" channel=\"{}\">\n",
                escape(&program.start),
                escape(&program.stop),
                escape(&program.channel_id)
            );

            if let Some(ref title) = program.title {
                program_line.push_str(&format!("    <title>{}</title>\n", escape(title)));
            }
            if let Some(ref description) = program.description {
                program_line.push_str(&format!("    <desc>{}</desc>\n", escape(description)));
            }
            if let Some(ref category) = program.category {
                program_line.push_str(&format!("    <category>{}</category>\n", escape(category)));
            }
            if let Some(ref language) = program.language {
                program_line.push_str(&format!("    <language>{}</language>\n", escape(language)));
            }
            if let Some(ref icon) = program.icon {
                program_line.push_str(&format!("    <icon src=\"{}\"/>\n", escape(icon)));
            }

            program_line.push_str("  </programme>\n");

            writer
                .write_all(program_line.as_bytes())
                .await
                .map_err(write_err)?;
            bytes_written += program_line.len() as u64;
        }

        let footer = "</tv>\n";
        writer
            .write_all(footer.as_bytes())
            .await
            .map_err(write_err)?;
        bytes_written += footer.len() as u64;

        writer.flush().await.map_err(write_err)?;
        let file = writer.into_inner();
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(write_err)?;

        info!(
            "Combined guide written: {} ({} channels, {} programmes, {} bytes)",
            display_path,
            guide.channels.len(),
            guide.programs.len(),
            bytes_written
        );

        Ok(bytes_written)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    PathBuf::from(temp)
}
