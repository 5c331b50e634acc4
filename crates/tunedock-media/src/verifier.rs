//! Artifact verification - MP3 signature checks

use std::path::Path;
use tokio::io::AsyncReadExt;

/// Second byte of an MPEG frame sync for the Layer III variants yt-dlp
/// produces (MPEG-1/2, with and without CRC).
const FRAME_SYNC_SECOND_BYTES: [u8; 4] = [0xFB, 0xF3, 0xFA, 0xF2];

/// Check whether a header prefix looks like an MP3 file.
///
/// Accepts an ID3v2 tag or a bare MPEG frame sync. This is a cheap sanity
/// check against transcode garbage, not a decode.
fn is_mp3_header(bytes: &[u8]) -> bool {
    if bytes.starts_with(b"ID3") {
        return true;
    }
    bytes.len() >= 2 && bytes[0] == 0xFF && FRAME_SYNC_SECOND_BYTES.contains(&bytes[1])
}

/// Read the first bytes of `path` and check them against the known MP3
/// signatures. Returns `Ok(false)` for files too short to carry one.
pub async fn verify_mp3(path: &Path) -> std::io::Result<bool> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut header = [0u8; 3];

    let mut read = 0;
    while read < header.len() {
        let n = file.read(&mut header[read..]).await?;
        if n == 0 {
            break;
        }
        read += n;
    }

    Ok(is_mp3_header(&header[..read]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_id3_tag_accepted() {
        assert!(is_mp3_header(b"ID3\x04\x00"));
    }

    #[test]
    fn test_all_frame_sync_variants_accepted() {
        for second in FRAME_SYNC_SECOND_BYTES {
            assert!(is_mp3_header(&[0xFF, second, 0x90]), "0xFF{:02X}", second);
        }
    }

    #[test]
    fn test_unknown_sync_byte_rejected() {
        assert!(!is_mp3_header(&[0xFF, 0xE3, 0x90]));
    }

    #[test]
    fn test_other_formats_rejected() {
        assert!(!is_mp3_header(b"RIFF\x00\x00"));
        assert!(!is_mp3_header(b"OggS"));
        assert!(!is_mp3_header(b"<html>"));
    }

    #[test]
    fn test_short_input_rejected() {
        assert!(!is_mp3_header(b""));
        assert!(!is_mp3_header(&[0xFF]));
        assert!(!is_mp3_header(b"ID"));
    }

    #[tokio::test]
    async fn test_verify_reads_file_header() {
        let dir = tempdir().unwrap();

        let good = dir.path().join("good.mp3");
        tokio::fs::write(&good, b"ID3\x04\x00\x00rest of tag").await.unwrap();
        assert!(verify_mp3(&good).await.unwrap());

        let sync = dir.path().join("sync.mp3");
        tokio::fs::write(&sync, [0xFFu8, 0xFB, 0x90, 0x64]).await.unwrap();
        assert!(verify_mp3(&sync).await.unwrap());

        let bad = dir.path().join("bad.mp3");
        tokio::fs::write(&bad, b"<html>not audio</html>").await.unwrap();
        assert!(!verify_mp3(&bad).await.unwrap());

        let empty = dir.path().join("empty.mp3");
        tokio::fs::write(&empty, b"").await.unwrap();
        assert!(!verify_mp3(&empty).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.mp3");
        assert!(verify_mp3(&missing).await.is_err());
    }
}
