use anyhow::{Context, Result};
use std::path::Path;

use i8086_rs::header::ExecHeader;

/// A loaded program: the header, when there is one, and its text segment.
#[derive(Debug, Clone)]
pub struct Image {
    pub header: Option<ExecHeader>,
    pub text: Vec<u8>,
}

/// Reads an a.out file and slices out its text segment.
pub fn load_image(path: &Path) -> Result<Image> {
    let file = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    parse_image(&file).with_context(|| format!("loading {}", path.display()))
}

pub fn parse_image(file: &[u8]) -> Result<Image> {
    let header = ExecHeader::parse(file)?;
    let range = header.text_range(file.len())?;
    Ok(Image {
        header: Some(header),
        text: file[range].to_vec(),
    })
}

/// Reads a headerless file; the whole window after `skip` is text.
pub fn load_raw_bin(path: &Path, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    raw_image(&file, skip, len)
}

pub fn raw_image(file: &[u8], skip: usize, len: Option<usize>) -> Result<Image> {
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    Ok(Image {
        header: None,
        text: payload.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aout(text: &[u8]) -> Vec<u8> {
        let mut file = vec![0u8; 32];
        file[..5].copy_from_slice(&[0x01, 0x03, 0x20, 0x04, 0x20]);
        file[8..12].copy_from_slice(&(text.len() as u32).to_le_bytes());
        file.extend_from_slice(text);
        file
    }

    #[test]
    fn text_segment_is_sliced_after_header() {
        let mut file = aout(&[0xB8, 0x05, 0x00]);
        file.extend_from_slice(&[0xAA, 0xBB]); // data segment
        let img = parse_image(&file).unwrap();
        assert_eq!(img.text, vec![0xB8, 0x05, 0x00]);
        assert_eq!(img.header.unwrap().sizes.unwrap().text, 3);
    }

    #[test]
    fn bad_magic_is_an_error() {
        let mut file = aout(&[0x90, 0x90]);
        file[0] = 0x02;
        let err = parse_image(&file).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn loader_maps_skip_and_len() {
        let path = std::env::temp_dir().join("_i8086_disasm_raw.bin");
        std::fs::write(&path, [0u8, 1, 2, 3, 4, 5]).unwrap();
        let img = load_raw_bin(&path, 2, Some(3)).unwrap();
        assert!(img.header.is_none());
        assert_eq!(img.text, vec![2, 3, 4]);
        assert!(load_raw_bin(&path, 7, None).is_err());
        assert!(load_raw_bin(&path, 2, Some(5)).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
