use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use round42_kbfix::format::module::ModuleFooter;

pub const DS_AT: usize = 0x2bbf;
pub const HANDLER_AT: usize = 0x0200;
pub const INIT_AT: usize = 0x0300;
pub const WRITE_AT: usize = 0x0400;
pub const READS_AT: [usize; 3] = [0x0500, 0x0600, 0x1a00];
pub const ROUND_AT: usize = 0x0700;
pub const UP_FLAG_AT: usize = 0x0800;

pub const FOOTER: ModuleFooter = ModuleFooter {
    vars_size: 0x0120,
    reset_buffer: 0xf400,
    put_scancode: 0xf41a,
    get_scancode: 0xf43c,
    on_round_start: 0xf460,
};

fn put(image: &mut [u8], at: usize, bytes: &[u8]) {
    image[at..at + bytes.len()].copy_from_slice(bytes);
}

/// A synthetic game image of `size` bytes carrying every signature once
/// (the scancode read several times).
pub fn game_image(size: usize, ds: u16) -> Vec<u8> {
    let mut image = vec![0u8; size];
    put(&mut image, HANDLER_AT, &[0x55, 0x8b, 0xec, 0x55, 0xe9, 0x00, 0x00, 0xa1, 0x9e, 0x0f]);
    put(&mut image, INIT_AT, &[0xa3, 0x9e, 0x0f]);
    put(&mut image, WRITE_AT, &[0x89, 0x1e, 0x9e, 0x0f]);
    for at in READS_AT {
        put(&mut image, at, &[0xa1, 0x9e, 0x0f]);
    }
    put(&mut image, ROUND_AT, &[0xe9, 0xa7, 0x01, 0xb9, 0x08, 0x00]);
    put(&mut image, UP_FLAG_AT, &[0xa0, 0x66, 0x0c, 0x0a, 0xc0, 0x74, 0x10, 0x64, 0x0c]);
    put(&mut image, DS_AT, &ds.to_le_bytes());
    image
}

pub fn module_blob() -> Vec<u8> {
    let mut blob = vec![0x90; 0x74];
    blob.extend_from_slice(&FOOTER.to_bytes());
    blob
}

pub struct TempDir {
    pub path: PathBuf,
}

impl TempDir {
    pub fn new(tag: &str) -> Self {
        let uniq = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("round42-kbfix-{tag}-{uniq}"));
        fs::create_dir_all(&path).expect("mkdir");
        Self { path }
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}
