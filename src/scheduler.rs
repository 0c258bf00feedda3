//! Block-parallel encode scheduler (§4.3, §5): partitions the block grid
//! across `T = num_helper_threads + 1` workers with a strided mapping,
//! clamps tile sampling to the image edge, reports progress only from the
//! calling thread's worker, and supports cooperative cancellation.
//!
//! Each block index `k` is assigned to worker `k mod T` (§4.3 point 2).
//! Rather than have every worker index into one shared buffer (which would
//! need `unsafe` to prove the writes are disjoint), the flat element buffer
//! is split up front into per-block chunks and each chunk is handed, by
//! value, to the one worker that owns it — disjointness is then enforced by
//! the borrow checker instead of argued about.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::backend;
use crate::block::Element;
use crate::error::{Error, Result};
use crate::format::DxtFormat;
use crate::image::{BlockImage, Shape};
use crate::params::EncodeParams;
use crate::pixel::{PixelSurface, Rgba};

const PROGRESS_POLL_INTERVAL: u64 = 64;

fn load_tile(surface: &dyn PixelSurface, block_x: u32, block_y: u32) -> [Rgba; 16] {
    let width = surface.width();
    let height = surface.height();
    let mut tile = [[0u8, 0, 0, 0]; 16];
    for sy in 0..4u32 {
        for sx in 0..4u32 {
            let x = (block_x * 4 + sx).min(width - 1);
            let y = (block_y * 4 + sy).min(height - 1);
            tile[(sy * 4 + sx) as usize] = surface.pixel(x, y);
        }
    }
    tile
}

/// One worker's share of the strided block partition: a list of
/// `(block_index, element_chunk)` pairs in ascending raster order.
fn run_worker(
    shape: &Shape,
    surface: &dyn PixelSurface,
    params: &EncodeParams,
    blocks: Vec<(u64, &mut [Element])>,
    total_blocks: u64,
    cancel: &AtomicBool,
    mut progress: Option<&mut dyn FnMut(u32) -> bool>,
) {
    let mut last_pct: Option<u32> = None;

    for (block_index, chunk) in blocks {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let block_x = (block_index % shape.blocks_x as u64) as u32;
        let block_y = (block_index / shape.blocks_x as u64) as u32;
        let tile = load_tile(surface, block_x, block_y);

        for (i, desc) in shape.format.elements().iter().enumerate() {
            chunk[i] =
                backend::encode_element(desc.kind, desc.component, &tile, params.compressor, shape.format, params);
        }

        if let Some(callback) = progress.as_deref_mut() {
            if block_index & (PROGRESS_POLL_INTERVAL - 1) == PROGRESS_POLL_INTERVAL - 1 {
                let pct = params.progress_start
                    + (((block_index * params.progress_range as u64) + total_blocks / 2) / total_blocks) as u32;
                if last_pct != Some(pct) {
                    last_pct = Some(pct);
                    if !callback(pct) {
                        log::debug!("encode cancelled by progress callback at {pct}%");
                        cancel.store(true, Ordering::Relaxed);
                        break;
                    }
                }
            }
        }
    }
}

/// Encodes `surface` into a new [`BlockImage`] (§4.3). `progress`, when
/// present, is polled only from the calling thread's worker; returning
/// `false` cancels the whole operation (§5).
pub(crate) fn encode(
    surface: &dyn PixelSurface,
    format: DxtFormat,
    params: &EncodeParams,
    mut progress: Option<&mut dyn FnMut(u32) -> bool>,
) -> Result<BlockImage> {
    let width = surface.width();
    let height = surface.height();
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    let shape = Shape::new(format, width, height)?;
    let total_blocks = shape.blocks_x as u64 * shape.blocks_y as u64;
    let num_workers = (params.num_helper_threads + 1) as u64;
    let elements_per_block = shape.format.elements_per_block();

    let mut elements = vec![Element::default(); shape.element_count()];
    let cancel = AtomicBool::new(false);

    let mut per_worker: Vec<Vec<(u64, &mut [Element])>> = (0..num_workers).map(|_| Vec::new()).collect();
    for (block_index, chunk) in elements.chunks_exact_mut(elements_per_block).enumerate() {
        let t = (block_index as u64) % num_workers;
        per_worker[t as usize].push((block_index as u64, chunk));
    }

    thread::scope(|scope| {
        let mut workers = per_worker.into_iter();
        let main_blocks = workers.next().expect("num_workers is always >= 1");

        let mut handles = Vec::with_capacity((num_workers - 1) as usize);
        for blocks in workers {
            let shape = &shape;
            let cancel = &cancel;
            handles.push(scope.spawn(move || {
                run_worker(shape, surface, params, blocks, total_blocks, cancel, None);
            }));
        }

        run_worker(&shape, surface, params, main_blocks, total_blocks, &cancel, progress.as_deref_mut());

        for handle in handles {
            handle.join().expect("encode worker thread panicked");
        }
    });

    if cancel.load(Ordering::Relaxed) {
        return Err(Error::Canceled);
    }
    Ok(BlockImage::from_parts(shape, elements))
}
