#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use anyhow::Result;
use canvas_core::{GenerationRequest, ImagePipeline, PromptTokenizer};
use canvas_server::{GenerationSettings, TextToImage, WorkerPool};
use image::{DynamicImage, Rgb, RgbImage};

const BOS: u32 = 0;
const EOS: u32 = 1;

/// Whitespace tokenizer that brackets every encoding with start/end ids.
#[derive(Default)]
pub struct WordTokenizer {
    words: Mutex<Vec<String>>,
}

impl PromptTokenizer for WordTokenizer {
    fn encode_ids(&self, text: &str) -> Result<Vec<u32>> {
        let mut words = self.words.lock().unwrap();
        let mut ids = vec![BOS];
        for word in text.split_whitespace() {
            let id = match words.iter().position(|w| w == word) {
                Some(pos) => pos,
                None => {
                    words.push(word.to_string());
                    words.len() - 1
                }
            };
            ids.push(id as u32 + 2);
        }
        ids.push(EOS);
        Ok(ids)
    }

    fn decode_ids(&self, ids: &[u32]) -> Result<String> {
        let words = self.words.lock().unwrap();
        Ok(ids
            .iter()
            .filter(|&&id| id > EOS)
            .map(|&id| words[(id - 2) as usize].as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }
}

/// Records every request and answers with a small solid image.
#[derive(Default)]
pub struct FakePipeline {
    pub tokenizer: WordTokenizer,
    pub seen: Mutex<Vec<GenerationRequest>>,
    /// Prompts containing this marker fail like a model error would.
    pub fail_marker: Option<String>,
    /// Prompts containing this marker crash the worker thread.
    pub panic_marker: Option<String>,
    /// Side of a square noise image, which PNG cannot compress much.
    pub noise_size: Option<u32>,
    pub delay: Option<Duration>,
    running: AtomicUsize,
    pub peak: AtomicUsize,
}

impl FakePipeline {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Default::default()
        }
    }

    pub fn panicking_on(marker: &str) -> Self {
        Self {
            panic_marker: Some(marker.to_string()),
            ..Default::default()
        }
    }

    pub fn noisy(size: u32) -> Self {
        Self {
            noise_size: Some(size),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl ImagePipeline for FakePipeline {
    fn run(&self, request: GenerationRequest) -> Result<DynamicImage> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        if let Some(marker) = &self.panic_marker {
            if request.prompt.contains(marker.as_str()) {
                panic!("CUDA_ERROR_ILLEGAL_ADDRESS");
            }
        }
        let fail = self
            .fail_marker
            .as_deref()
            .is_some_and(|marker| request.prompt.contains(marker));
        self.seen.lock().unwrap().push(request);
        if fail {
            anyhow::bail!("index out of range in self");
        }
        Ok(match self.noise_size {
            Some(size) => DynamicImage::ImageRgb8(noise(size)),
            None => DynamicImage::new_rgb8(8, 8),
        })
    }

    fn prompt_tokenizer(&self) -> &dyn PromptTokenizer {
        &self.tokenizer
    }
}

fn noise(size: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let mut v = y.wrapping_mul(size).wrapping_add(x);
        v = (v ^ (v >> 16)).wrapping_mul(0x85EB_CA6B);
        v = (v ^ (v >> 13)).wrapping_mul(0xC2B2_AE35);
        v ^= v >> 16;
        Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
    })
}

pub fn service(pipeline: Arc<FakePipeline>, workers: usize) -> TextToImage {
    TextToImage::new(pipeline, WorkerPool::new(workers), GenerationSettings::default())
}
