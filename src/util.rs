use std::path::{Path, PathBuf};

use image::{DynamicImage, Pixel, Rgb};
use ndarray::Array3;
use ort::{ExecutionProviderDispatch, GraphOptimizationLevel, Session};
use tracing::instrument;

use crate::{error::OcrError, ExecutionProvider, PlateBox};

#[instrument(level = "debug", skip(image))]
pub(crate) fn subtract_mean_normalize(
    image: &DynamicImage,
    mean_vals: &[f32; 3],
    norm_vals: &[f32; 3],
) -> Array3<f32> {
    let mut image = image.to_rgb32f();
    let norm = Rgb::<f32>(*norm_vals);
    let mean_vals = Rgb::<f32>(*mean_vals).map2(&norm, |c1, c2| c1 * c2);
    for pixel in image.pixels_mut() {
        *pixel = pixel
            .map2(&norm, |c1, c2| c1 * c2)
            .map2(&mean_vals, |c1, c2| c1 - c2);
    }
    Array3::<f32>::from_shape_fn(
        (3, image.height() as usize, image.width() as usize),
        |(ch, y, x)| image.get_pixel(x as u32, y as u32).channels()[ch],
    )
}

/// RGB pixels scaled to [0, 1] in CHW order, the detection model's input
/// convention.
pub(crate) fn to_unit_tensor(image: &DynamicImage) -> Array3<f32> {
    let image = image.to_rgb8();
    Array3::<f32>::from_shape_fn(
        (3, image.height() as usize, image.width() as usize),
        |(ch, y, x)| f32::from(image.get_pixel(x as u32, y as u32).channels()[ch]) / 255.0,
    )
}

/// Extracts the sub-image under a detection box, clamped to the image
/// bounds. Returns `None` for a degenerate box whose clamped area is zero;
/// callers skip such plates.
pub(crate) fn crop_box(image: &DynamicImage, b_box: &PlateBox) -> Option<DynamicImage> {
    let x = b_box.x1.min(image.width());
    let y = b_box.y1.min(image.height());
    let width = b_box.x2.min(image.width()).saturating_sub(x);
    let height = b_box.y2.min(image.height()).saturating_sub(y);
    if width == 0 || height == 0 {
        log::trace!("degenerate box {b_box:?}, skipping crop");
        return None;
    }
    Some(image.crop_imm(x, y, width, height))
}

#[cfg(feature = "tensorrt")]
fn setup_tensorrt(cache_path: PathBuf) -> ExecutionProviderDispatch {
    use ort::TensorRTExecutionProvider;

    TensorRTExecutionProvider::default()
        .with_engine_cache(true)
        .with_engine_cache_path(cache_path.to_string_lossy())
        .with_timing_cache(true)
        .build()
}

#[cfg(feature = "cuda")]
fn setup_cuda() -> ExecutionProviderDispatch {
    use ort::CUDAExecutionProvider;

    CUDAExecutionProvider::default().build()
}

#[cfg(feature = "directml")]
fn setup_directml() -> ExecutionProviderDispatch {
    use ort::DirectMLExecutionProvider;

    DirectMLExecutionProvider::default().build()
}

#[cfg(feature = "coreml")]
fn setup_coreml() -> ExecutionProviderDispatch {
    use ort::CoreMLExecutionProvider;

    CoreMLExecutionProvider::default().build()
}

/// Builds an ONNX session for one model artifact. Both pipeline models go
/// through here so they share threading and provider configuration.
#[instrument(level = "debug", skip(execution_providers, cache_path))]
pub(crate) fn build_session(
    path: &Path,
    num_threads: usize,
    execution_providers: &[ExecutionProvider],
    cache_path: Option<PathBuf>,
) -> Result<Session, OcrError> {
    #[cfg(feature = "directml")]
    let parallel = execution_providers.contains(&ExecutionProvider::DirectML);
    #[cfg(not(feature = "directml"))]
    let parallel = true;

    let execution_providers =
        execution_providers
            .iter()
            .filter_map(|provider| -> Option<ExecutionProviderDispatch> {
                match provider {
                    ExecutionProvider::Default => None,
                    #[cfg(feature = "tensorrt")]
                    ExecutionProvider::TensorRT => Some(setup_tensorrt(
                        cache_path
                            .clone()
                            .unwrap_or_else(|| path.with_extension("cache")),
                    )),
                    #[cfg(feature = "cuda")]
                    ExecutionProvider::Cuda => Some(setup_cuda()),
                    #[cfg(feature = "directml")]
                    ExecutionProvider::DirectML => Some(setup_directml()),
                    #[cfg(feature = "coreml")]
                    ExecutionProvider::CoreML => Some(setup_coreml()),
                }
            });

    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_memory_pattern(parallel)?
        .with_parallel_execution(parallel)?
        .with_inter_threads(num_threads)?
        .with_intra_threads(num_threads)?
        .with_execution_providers(execution_providers)?
        .commit_from_file(path)?;

    Ok(session)
}
