#![allow(dead_code)]

use image::{GrayImage, Luma};
use std::fs;
use std::path::Path;

pub const WIDTH: u32 = 240;
pub const HEIGHT: u32 = 200;
pub const EYE: (u32, u32) = (60, 50);
pub const TEMPLATE_SIZE: (u32, u32) = (12, 10);
pub const TAIL_BASE: (u32, u32) = (120, 100);
pub const TAIL_TIP: (u32, u32) = (180, 140);

pub const FRAME_NAMES: [&str; 3] = [
    "fish_001_image.png",
    "fish_002_image.png",
    "fish_003_image.png",
];

/// Deterministic pseudo-random bytes.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        })
        .collect()
}

pub fn eye_template() -> GrayImage {
    let (w, h) = TEMPLATE_SIZE;
    GrayImage::from_raw(w, h, noise((w * h) as usize, 7)).expect("template buffer")
}

/// Noise frame with the eye template pasted at [`EYE`].
pub fn frame(seed: u32) -> GrayImage {
    let mut img = GrayImage::from_raw(WIDTH, HEIGHT, noise((WIDTH * HEIGHT) as usize, seed))
        .expect("frame buffer");
    let template = eye_template();
    for (x, y, px) in template.enumerate_pixels() {
        img.put_pixel(EYE.0 + x, EYE.1 + y, *px);
    }
    img
}

pub fn log_text() -> String {
    format!(
        "session start\nPosition \"tailbase\" was set to (10,10)!\n\
         Position \"tailtip\" was set to ({},{})!\n\
         Position \"tailbase\" was set to ({},{})!\n",
        TAIL_TIP.0, TAIL_TIP.1, TAIL_BASE.0, TAIL_BASE.1
    )
}

/// Dataset of three frames; the third frame has no log.
pub fn write_dataset(root: &Path) {
    fs::create_dir_all(root.join("logs")).expect("logs dir");
    fs::create_dir_all(root.join("eye_template")).expect("template dir");
    eye_template()
        .save(root.join("eye_template").join("eye_template.png"))
        .expect("save template");

    for (i, name) in FRAME_NAMES.iter().enumerate() {
        frame(100 + i as u32)
            .save(root.join(name))
            .expect("save frame");
        if i < 2 {
            let log_name = name.replace("image.png", "log.txt");
            fs::write(root.join("logs").join(log_name), log_text()).expect("write log");
        }
    }
}

pub fn load_gray(path: &Path) -> GrayImage {
    image::open(path).expect("open crop").to_luma8()
}

/// `size`×`size` slice of `img` starting at `(x0, y0)`.
pub fn slice(img: &GrayImage, x0: u32, y0: u32, size: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| Luma(img.get_pixel(x0 + x, y0 + y).0))
}
