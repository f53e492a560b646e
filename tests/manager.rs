//! End-to-end lookups through the real raster renderer.

use filetime::{FileTime, set_file_mtime};
use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use nailclipper::config::ManagerConfig;
use nailclipper::imaging::ResizeStyle;
use nailclipper::manager::{Thumbnail, ThumbnailManager};
use nailclipper::metadata::read_provenance;
use nailclipper::refresh::RefreshPolicy;
use nailclipper::types::SizeClass;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn write_png(dir: &Path, name: &str, w: u32, h: u32, rgba: [u8; 4]) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_pixel(w, h, Rgba(rgba)).save(&path).unwrap();
    path
}

fn write_jpeg(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(w, h, Rgb([200, 100, 50])).save(&path).unwrap();
    path
}

fn write_circle_mask(dir: &Path, size: u32) -> PathBuf {
    let path = dir.join("circle.png");
    let r = size as f32 / 2.0;
    GrayImage::from_fn(size, size, |x, y| {
        let (dx, dy) = (x as f32 + 0.5 - r, y as f32 + 0.5 - r);
        Luma([if dx * dx + dy * dy <= r * r { 255 } else { 0 }])
    })
    .save(&path)
    .unwrap();
    path
}

fn config(tmp: &Path) -> ManagerConfig {
    ManagerConfig::in_dir(tmp.join("cache"))
}

fn manager(config: ManagerConfig) -> ThumbnailManager {
    ThumbnailManager::new(config).unwrap()
}

fn generated(outcome: Thumbnail) -> PathBuf {
    match outcome {
        Thumbnail::Generated(p) => p,
        other => panic!("expected a generated thumbnail, got {other:?}"),
    }
}

fn load(path: &Path) -> RgbaImage {
    image::open(path).unwrap().to_rgba8()
}

fn recorded_mtime(path: &Path) -> Option<(u64, u32)> {
    read_provenance(path).unwrap().mtime.map(|m| (m.secs, m.nanos))
}

fn modified(path: &Path) -> SystemTime {
    std::fs::metadata(path).unwrap().modified().unwrap()
}

fn input(path: &Path) -> &str {
    path.to_str().unwrap()
}

// =========================================================================
// Paths
// =========================================================================

#[test]
fn path_derivation_is_deterministic() {
    let tmp = TempDir::new().unwrap();
    let m = manager(config(tmp.path()));
    for size in [
        SizeClass::Normal,
        SizeClass::XXLarge,
        SizeClass::Custom {
            width: 300,
            height: 200,
        },
    ] {
        assert_eq!(
            m.thumbnail_path("https://example.com/a.pdf", size).unwrap(),
            m.thumbnail_path("https://example.com/a.pdf", size).unwrap()
        );
    }
}

#[test]
fn equivalent_spellings_share_a_path() {
    // Relative spellings are resolved against the working directory.
    let tmp = tempfile::Builder::new().tempdir_in(".").unwrap();
    let photo = write_png(tmp.path(), "photo.png", 4, 4, RED);
    let dir_name = tmp.path().file_name().unwrap().to_string_lossy().into_owned();
    let absolute = std::fs::canonicalize(&photo).unwrap();

    let m = manager(config(tmp.path()));
    let expected = m.thumbnail_path(input(&absolute), SizeClass::Normal).unwrap();
    for spelling in [
        format!("{dir_name}/photo.png"),
        format!("./{dir_name}/../{dir_name}/photo.png"),
        url::Url::from_file_path(&absolute).unwrap().to_string(),
    ] {
        assert_eq!(
            m.thumbnail_path(&spelling, SizeClass::Normal).unwrap(),
            expected,
            "{spelling}"
        );
    }
}

#[test]
fn standard_sizes_share_the_hash_stem() {
    let tmp = TempDir::new().unwrap();
    let jpeg = write_jpeg(tmp.path(), "shot.jpg", 640, 480);
    let m = manager(config(tmp.path()));

    let normal = generated(m.get_thumbnail(input(&jpeg), SizeClass::Normal).unwrap());
    let large = generated(m.get_thumbnail(input(&jpeg), SizeClass::Large).unwrap());

    assert_eq!(load(&normal).dimensions(), (128, 96));
    assert_eq!(load(&large).dimensions(), (256, 192));
    assert_eq!(normal.file_name(), large.file_name());
    assert_ne!(normal.parent(), large.parent());
    assert!(normal.starts_with(tmp.path().join("cache/normal")));
    assert!(large.starts_with(tmp.path().join("cache/large")));
}

// =========================================================================
// Geometry
// =========================================================================

#[test]
fn fit_never_upscales_when_disabled() {
    let tmp = TempDir::new().unwrap();
    let wide = write_png(tmp.path(), "wide.png", 80, 20, RED);
    let mut cfg = config(tmp.path());
    cfg.default.upscale = false;

    let thumb = generated(manager(cfg).get_thumbnail(input(&wide), SizeClass::Normal).unwrap());
    assert_eq!(load(&thumb).dimensions(), (80, 20));
}

#[test]
fn fit_keeps_aspect_ratio() {
    let tmp = TempDir::new().unwrap();
    let wide = write_png(tmp.path(), "wide.png", 80, 20, RED);
    let thumb = generated(
        manager(config(tmp.path()))
            .get_thumbnail(input(&wide), SizeClass::Normal)
            .unwrap(),
    );
    assert_eq!(load(&thumb).dimensions(), (128, 32));
}

#[test]
fn fill_and_stretch_hit_the_target_exactly() {
    for style in [ResizeStyle::Fill, ResizeStyle::Stretch] {
        let tmp = TempDir::new().unwrap();
        let wide = write_png(tmp.path(), "wide.png", 400, 100, RED);
        let mut cfg = config(tmp.path());
        cfg.default.resize_style = style;

        let thumb = generated(manager(cfg).get_thumbnail(input(&wide), SizeClass::Normal).unwrap());
        let img = load(&thumb);
        assert_eq!(img.dimensions(), (128, 128), "{style:?}");
        assert!(img.pixels().all(|p| p.0[3] == 255), "{style:?} left a border");
    }
}

#[test]
fn pad_centers_fitted_content_on_exact_canvas() {
    let tmp = TempDir::new().unwrap();
    let wide = write_png(tmp.path(), "wide.png", 400, 100, RED);
    let mut cfg = config(tmp.path());
    cfg.default.resize_style = ResizeStyle::Pad;

    let thumb = generated(manager(cfg).get_thumbnail(input(&wide), SizeClass::Normal).unwrap());
    let img = load(&thumb);
    assert_eq!(img.dimensions(), (128, 128));

    let opaque_rows = (0..128).filter(|&y| img.get_pixel(64, y).0[3] == 255).count();
    assert_eq!(opaque_rows, 32);
    assert_eq!(img.get_pixel(64, 0).0[3], 0);
    assert_eq!(img.get_pixel(64, 64).0, RED);
    assert_eq!(img.get_pixel(64, 127).0[3], 0);
}

#[test]
fn circular_mask_clears_corners() {
    let tmp = TempDir::new().unwrap();
    let square = write_png(tmp.path(), "red.png", 256, 256, RED);
    write_circle_mask(tmp.path(), 256);
    let mut cfg = config(tmp.path());
    cfg.base_dir = tmp.path().to_path_buf();
    cfg.default.mask = Some("circle.png".into());

    let thumb = generated(manager(cfg).get_thumbnail(input(&square), SizeClass::Large).unwrap());
    let img = load(&thumb);
    assert_eq!(img.dimensions(), (256, 256));
    for (x, y) in [(0, 0), (255, 0), (0, 255), (255, 255)] {
        assert_eq!(img.get_pixel(x, y).0[3], 0, "corner ({x}, {y})");
    }
    assert_eq!(img.get_pixel(128, 128).0, RED);
}

// =========================================================================
// Caching and refresh
// =========================================================================

#[test]
fn second_lookup_is_a_hit_without_rewrite() {
    let tmp = TempDir::new().unwrap();
    let photo = write_png(tmp.path(), "photo.png", 64, 64, RED);
    let m = manager(config(tmp.path()));

    let path = generated(m.get_thumbnail(input(&photo), SizeClass::Normal).unwrap());
    let before = (modified(&path), std::fs::read(&path).unwrap());

    assert_eq!(
        m.get_thumbnail(input(&photo), SizeClass::Normal).unwrap(),
        Thumbnail::Cached(path.clone())
    );
    assert_eq!((modified(&path), std::fs::read(&path).unwrap()), before);
}

#[test]
fn changed_source_is_regenerated_under_freedesktop_refresh() {
    let tmp = TempDir::new().unwrap();
    let photo = write_png(tmp.path(), "photo.png", 64, 64, RED);
    set_file_mtime(&photo, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

    let mut cfg = config(tmp.path());
    cfg.refresh = RefreshPolicy::Freedesktop;
    let m = manager(cfg);

    let path = generated(m.get_thumbnail(input(&photo), SizeClass::Normal).unwrap());
    assert_eq!(load(&path).get_pixel(10, 10).0, RED);
    assert_eq!(recorded_mtime(&path), Some((1_600_000_000, 0)));

    // Backdate the artifact so a rewrite is visible in its mtime.
    let old = FileTime::from_unix_time(1_500_000_000, 0);
    set_file_mtime(&path, old).unwrap();

    write_png(tmp.path(), "photo.png", 64, 64, BLUE);
    set_file_mtime(&photo, FileTime::from_unix_time(1_600_000_100, 0)).unwrap();

    let again = generated(m.get_thumbnail(input(&photo), SizeClass::Normal).unwrap());
    assert_eq!(again, path);
    assert_ne!(FileTime::from_last_modification_time(&std::fs::metadata(&path).unwrap()), old);
    assert_eq!(load(&path).get_pixel(10, 10).0, BLUE);
    assert_eq!(recorded_mtime(&path), Some((1_600_000_100, 0)));
}

#[test]
fn same_size_edit_within_one_second_is_regenerated() {
    let tmp = TempDir::new().unwrap();
    let photo = write_png(tmp.path(), "photo.png", 8, 8, RED);
    set_file_mtime(&photo, FileTime::from_unix_time(1_600_000_000, 100_000_000)).unwrap();

    let mut cfg = config(tmp.path());
    cfg.refresh = RefreshPolicy::Freedesktop;
    let m = manager(cfg);

    let path = generated(m.get_thumbnail(input(&photo), SizeClass::Normal).unwrap());
    assert_eq!(recorded_mtime(&path), Some((1_600_000_000, 100_000_000)));

    let size_before = std::fs::metadata(&photo).unwrap().len();
    write_png(tmp.path(), "photo.png", 8, 8, BLUE);
    assert_eq!(std::fs::metadata(&photo).unwrap().len(), size_before);
    set_file_mtime(&photo, FileTime::from_unix_time(1_600_000_000, 600_000_000)).unwrap();

    let again = generated(m.get_thumbnail(input(&photo), SizeClass::Normal).unwrap());
    assert_eq!(again, path);
    assert_eq!(load(&path).get_pixel(4, 4).0, BLUE);
}

#[test]
fn untouched_source_keeps_artifact_under_freedesktop_refresh() {
    let tmp = TempDir::new().unwrap();
    let photo = write_png(tmp.path(), "photo.png", 64, 64, RED);
    let mut cfg = config(tmp.path());
    cfg.refresh = RefreshPolicy::Freedesktop;
    let m = manager(cfg);

    let path = generated(m.get_thumbnail(input(&photo), SizeClass::Normal).unwrap());
    let before = (modified(&path), std::fs::read(&path).unwrap());
    for _ in 0..3 {
        assert!(matches!(
            m.get_thumbnail(input(&photo), SizeClass::Normal).unwrap(),
            Thumbnail::Cached(_)
        ));
    }
    assert_eq!((modified(&path), std::fs::read(&path).unwrap()), before);
}

// =========================================================================
// Failures
// =========================================================================

#[test]
fn unrenderable_file_is_negatively_cached() {
    let tmp = TempDir::new().unwrap();
    let notes = tmp.path().join("notes.txt");
    std::fs::write(&notes, "not an image").unwrap();
    let m = manager(config(tmp.path()));

    assert_eq!(
        m.get_thumbnail(input(&notes), SizeClass::Normal).unwrap(),
        Thumbnail::Failed
    );
    assert!(!m.thumbnail_path(input(&notes), SizeClass::Normal).unwrap().exists());
    assert!(m.failure_path(input(&notes)).unwrap().exists());

    assert_eq!(
        m.get_thumbnail(input(&notes), SizeClass::Normal).unwrap(),
        Thumbnail::PreviouslyFailed
    );

    assert!(m.clear_failure(input(&notes)).unwrap());
    assert_eq!(
        m.get_thumbnail(input(&notes), SizeClass::Normal).unwrap(),
        Thumbnail::Failed
    );
}

#[test]
fn missing_file_fails_without_error() {
    let tmp = TempDir::new().unwrap();
    let m = manager(config(tmp.path()));
    let ghost = tmp.path().join("ghost.png");
    assert_eq!(
        m.get_thumbnail(input(&ghost), SizeClass::Normal).unwrap(),
        Thumbnail::Failed
    );
}
