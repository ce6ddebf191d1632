use std::fs;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ArtworkSettings;
use crate::error::MediaError;
use crate::session::ArtworkSource;

/// Result of resolving an artwork source
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Artwork {
    /// PNG bytes bounded to the configured box
    pub image: Option<Vec<u8>>,
    /// Location handed to the caller when the bytes were not fetched
    pub uri: Option<String>,
}

/// Turns whatever a platform offers as artwork into bounded PNG bytes
pub struct ArtworkLoader {
    settings: ArtworkSettings,
    agent: ureq::Agent,
}

impl ArtworkLoader {
    pub fn new(settings: ArtworkSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .user_agent(concat!("nowplaying/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { settings, agent }
    }

    pub fn enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Resolve a source. Failures are logged and yield empty artwork.
    pub fn load(&self, source: &ArtworkSource) -> Artwork {
        if !self.settings.enabled {
            return Artwork::default();
        }

        match self.try_load(source) {
            Ok(artwork) => artwork,
            Err(e) => {
                tracing::warn!("[Artwork] Could not load artwork: {}", e);
                match source {
                    ArtworkSource::Url(url) if is_remote(url) => Artwork {
                        image: None,
                        uri: Some(url.clone()),
                    },
                    _ => Artwork::default(),
                }
            }
        }
    }

    fn try_load(&self, source: &ArtworkSource) -> Result<Artwork, MediaError> {
        match source {
            ArtworkSource::Bytes(bytes) => Ok(Artwork {
                image: Some(normalize(bytes, self.settings.max_size)?),
                uri: None,
            }),
            ArtworkSource::Url(url) if is_remote(url) => {
                if !self.settings.fetch_remote {
                    return Ok(Artwork {
                        image: None,
                        uri: Some(url.clone()),
                    });
                }
                let bytes = self.fetch(url)?;
                Ok(Artwork {
                    image: Some(normalize(&bytes, self.settings.max_size)?),
                    uri: None,
                })
            }
            ArtworkSource::Url(url) => match local_path(url) {
                Some(path) => {
                    let bytes = read_capped(fs::File::open(&path)?, self.settings.max_bytes)?;
                    Ok(Artwork {
                        image: Some(normalize(&bytes, self.settings.max_size)?),
                        uri: None,
                    })
                }
                None => {
                    tracing::debug!("[Artwork] Unsupported artwork location: {}", url);
                    Ok(Artwork {
                        image: None,
                        uri: Some(url.clone()),
                    })
                }
            },
        }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        tracing::debug!("[Artwork] Fetching {}", url);
        let response = self.agent.get(url).call().map_err(|e| MediaError::Http {
            url: url.to_string(),
            details: e.to_string(),
        })?;
        read_capped(response.into_reader(), self.settings.max_bytes)
    }
}

/// Decode, shrink to fit `max_size` x `max_size` and re-encode as PNG
pub fn normalize(bytes: &[u8], max_size: u32) -> Result<Vec<u8>, MediaError> {
    let mut img = image::load_from_memory(bytes)?;

    // Keep the aspect ratio, never upscale
    if img.width() > max_size || img.height() > max_size {
        img = img.thumbnail(max_size, max_size);
    }

    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)?;
    Ok(out)
}

fn read_capped<R: Read>(reader: R, max_bytes: u64) -> Result<Vec<u8>, MediaError> {
    let mut bytes = Vec::new();
    reader.take(max_bytes.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > max_bytes {
        return Err(MediaError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("artwork larger than {} bytes", max_bytes),
        )));
    }
    Ok(bytes)
}

fn is_remote(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Local filesystem path for a `file://` URL or a plain absolute path
fn local_path(url: &str) -> Option<PathBuf> {
    // most linux players return "file:///path/to/image.jpg"
    if let Some(rest) = url.strip_prefix("file://") {
        // "file://localhost/..." is legal too
        let path_str = rest.strip_prefix("localhost").unwrap_or(rest);
        return Some(PathBuf::from(url_decode(path_str)));
    }
    if url.starts_with('/') {
        return Some(PathBuf::from(url));
    }
    None
}

/// Minimal percent-decoder for file paths (handles spaces/special chars)
fn url_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or_default();
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                output.push(byte);
                i += 3;
                continue;
            }
        }
        output.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&output).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};

    fn encoded(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), format).unwrap();
        out
    }

    fn settings() -> ArtworkSettings {
        ArtworkSettings::default()
    }

    #[test]
    fn test_normalize_shrinks_to_box() {
        let png = normalize(&encoded(800, 600, ImageOutputFormat::Png), 400).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (400, 300));
        assert_eq!(image::guess_format(&png).unwrap(), image::ImageFormat::Png);
    }

    #[test]
    fn test_normalize_never_upscales() {
        let png = normalize(&encoded(64, 32, ImageOutputFormat::Png), 400).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (64, 32));
    }

    #[test]
    fn test_jpeg_becomes_png() {
        let png = normalize(&encoded(500, 500, ImageOutputFormat::Jpeg(80)), 400).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), image::ImageFormat::Png);
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (400, 400));
    }

    #[test]
    fn test_garbage_bytes_give_no_image() {
        let loader = ArtworkLoader::new(settings());
        let art = loader.load(&ArtworkSource::Bytes(vec![0, 1, 2, 3]));
        assert_eq!(art, Artwork::default());
    }

    #[test]
    fn test_remote_url_passes_through_without_fetch() {
        let loader = ArtworkLoader::new(settings());
        let url = "https://i.scdn.co/image/ab67616d0000b273".to_string();
        let art = loader.load(&ArtworkSource::Url(url.clone()));
        assert_eq!(art.image, None);
        assert_eq!(art.uri, Some(url));
    }

    #[test]
    fn test_disabled_loader_skips_everything() {
        let mut s = settings();
        s.enabled = false;
        let loader = ArtworkLoader::new(s);
        let art = loader.load(&ArtworkSource::Bytes(encoded(10, 10, ImageOutputFormat::Png)));
        assert_eq!(art, Artwork::default());
    }

    #[test]
    fn test_file_url_is_read_and_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover art.png");
        fs::write(&path, encoded(1000, 500, ImageOutputFormat::Png)).unwrap();

        let url = format!("file://{}", path.display()).replace(' ', "%20");
        let loader = ArtworkLoader::new(settings());
        let art = loader.load(&ArtworkSource::Url(url));

        let img = image::load_from_memory(&art.image.unwrap()).unwrap();
        assert_eq!((img.width(), img.height()), (400, 200));
        assert_eq!(art.uri, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        fs::write(&path, encoded(100, 100, ImageOutputFormat::Png)).unwrap();

        let mut s = settings();
        s.max_bytes = 10;
        let loader = ArtworkLoader::new(s);
        let art = loader.load(&ArtworkSource::Url(path.display().to_string()));
        assert_eq!(art, Artwork::default());
    }

    #[test]
    fn test_unbounded_byte_cap_still_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        fs::write(&path, encoded(4, 4, ImageOutputFormat::Png)).unwrap();

        let mut s = settings();
        s.max_bytes = u64::MAX;
        let loader = ArtworkLoader::new(s);
        let art = loader.load(&ArtworkSource::Url(path.display().to_string()));
        let img = image::load_from_memory(&art.image.unwrap()).unwrap();
        assert_eq!((img.width(), img.height()), (4, 4));

        assert_eq!(read_capped(&b"abc"[..], u64::MAX).unwrap(), b"abc");
    }

    #[test]
    fn test_read_capped_limit() {
        assert_eq!(read_capped(&b"abc"[..], 3).unwrap(), b"abc");
        assert!(read_capped(&b"abcd"[..], 3).is_err());
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("/home/me/My%20Music/a.jpg"), "/home/me/My Music/a.jpg");
        assert_eq!(url_decode("/caf%C3%A9.png"), "/café.png");
        assert_eq!(url_decode("/100%"), "/100%");
        assert_eq!(url_decode("/50%zz"), "/50%zz");
    }

    #[test]
    fn test_local_path() {
        assert_eq!(local_path("file:///tmp/a%20b.jpg"), Some(PathBuf::from("/tmp/a b.jpg")));
        assert_eq!(local_path("file://localhost/tmp/x.png"), Some(PathBuf::from("/tmp/x.png")));
        assert_eq!(local_path("/tmp/x.png"), Some(PathBuf::from("/tmp/x.png")));
        assert_eq!(local_path("data:image/png;base64,AAAA"), None);
    }
}
