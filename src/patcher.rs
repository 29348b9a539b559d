use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::builder::{BuildParams, ModuleBuilder, NasmBuilder};
use crate::cli::Args;
use crate::cosmetic::apply_version_box;
use crate::encoder::{apply_call, CALL_NEAR_LEN};
use crate::error::PatchError;
use crate::format::module::{ExtensionModule, ModuleFooter};
use crate::matcher::{find_all, find_unique};
use crate::profile::{recognize, VersionProfile, BOX_WIDTH, COM_LOAD_BASE, GAME_FILE_NAME};
use crate::segment::{plan_segment_fix, SegmentFix, SegmentLayout};
use crate::signature::{Signatures, ROUND_MESSAGE_SITE_SKIP, UP_FLAG_OPERAND_SKIP};

/// Steps of a patch run, in the only order they may happen.
///
/// A run carries its current stage along; stepping back or
/// repeating a stage is a bug and panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Loaded,
    SitesLocated,
    ModuleBuilt,
    FooterParsed,
    SegmentFixed,
    SitesPatched,
    CosmeticsApplied,
    Written,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteRole {
    /// `mov [last_scancode], ax` run once at startup.
    InitWrite,
    /// `mov [last_scancode], bx` in the keyboard interrupt path.
    SingleWrite,
    /// `mov ax, [last_scancode]`, wherever the game polls input.
    Read,
    /// The instruction following the jump to the round message.
    BranchAfterJump,
}

impl SiteRole {
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            SiteRole::SingleWrite => 4,
            SiteRole::InitWrite | SiteRole::Read | SiteRole::BranchAfterJump => CALL_NEAR_LEN,
        }
    }

    #[must_use]
    pub fn target(self, footer: &ModuleFooter) -> u16 {
        match self {
            SiteRole::InitWrite => footer.reset_buffer,
            SiteRole::SingleWrite => footer.put_scancode,
            SiteRole::Read => footer.get_scancode,
            SiteRole::BranchAfterJump => footer.on_round_start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSite {
    pub offset: usize,
    pub width: usize,
    pub role: SiteRole,
}

impl PatchSite {
    fn new(offset: usize, role: SiteRole) -> Self {
        Self {
            offset,
            width: role.width(),
            role,
        }
    }

    fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchedSite {
    pub site: PatchSite,
    pub target: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub profile: &'static str,
    pub key_handler: u16,
    pub segment_fix: SegmentFix,
    pub sites: Vec<PatchedSite>,
    /// Offset of the 16-bit operand changed by the movement fix.
    pub up_flag_operand: usize,
}

impl PatchReport {
    #[must_use]
    pub fn sites_with_role(&self, role: SiteRole) -> Vec<&PatchedSite> {
        self.sites.iter().filter(|s| s.site.role == role).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PatchOutcome {
    image: Vec<u8>,
    module: ExtensionModule,
    report: PatchReport,
    progress: Progress,
}

impl PatchOutcome {
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.progress.stage
    }

    #[must_use]
    pub fn report(&self) -> &PatchReport {
        &self.report
    }

    #[must_use]
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    #[must_use]
    pub fn module(&self) -> &ExtensionModule {
        &self.module
    }

    /// Patched image followed by the extension module.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = self.image;
        out.extend_from_slice(self.module.bytes());
        out
    }
}

const STAGING_SUFFIX: &str = ".partial";

/// Every byte range a run will modify, checked up front for overlaps.
#[derive(Debug, Default)]
struct PatchPlan {
    ranges: Vec<(Range<usize>, String)>,
}

impl PatchPlan {
    fn add(&mut self, range: Range<usize>, label: impl Into<String>) {
        self.ranges.push((range, label.into()));
    }

    fn validate(&mut self, image_len: usize) -> Result<(), PatchError> {
        self.ranges.sort_by_key(|(range, _)| (range.start, range.end));
        for (range, _) in &self.ranges {
            if range.end > image_len {
                return Err(PatchError::SiteOutOfRange {
                    offset: range.start,
                    width: range.len(),
                    len: image_len,
                });
            }
        }
        for pair in self.ranges.windows(2) {
            let (a, a_label) = &pair[0];
            let (b, b_label) = &pair[1];
            if b.start < a.end {
                return Err(PatchError::OverlappingPatches {
                    first: format!("{a_label} at {:#06x}..{:#06x}", a.start, a.end),
                    second: format!("{b_label} at {:#06x}..{:#06x}", b.start, b.end),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct LocatedSites {
    key_handler: u16,
    sites: Vec<PatchSite>,
    up_flag_operand: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Progress {
    stage: Stage,
}

impl Progress {
    fn start() -> Self {
        debug!(stage = ?Stage::Loaded, "patch stage reached");
        Self {
            stage: Stage::Loaded,
        }
    }

    fn advance(&mut self, next: Stage) {
        assert!(
            next > self.stage,
            "patch stage {next:?} cannot follow {:?}",
            self.stage
        );
        self.stage = next;
        debug!(stage = ?next, "patch stage reached");
    }
}

/// Bumps the little-endian word at `at` by one.
fn increment_word(image: &mut [u8], at: usize) -> Result<u16, PatchError> {
    let len = image.len();
    let slot = image.get_mut(at..at + 2).ok_or(PatchError::SiteOutOfRange {
        offset: at,
        width: 2,
        len,
    })?;
    let value = u16::from_le_bytes([slot[0], slot[1]]).wrapping_add(1);
    slot.copy_from_slice(&value.to_le_bytes());
    Ok(value)
}

fn locate_sites(image: &[u8], profile: &VersionProfile) -> Result<LocatedSites, PatchError> {
    let sigs = Signatures::for_profile(profile);

    let handler_offset = find_unique(image, &sigs.key_handler)?;
    let key_handler = u16::try_from(handler_offset)
        .ok()
        .and_then(|offset| offset.checked_add(COM_LOAD_BASE))
        .ok_or(PatchError::SiteOutOfRange {
            offset: handler_offset,
            width: sigs.key_handler.len(),
            len: image.len(),
        })?;
    debug!(offset = handler_offset, address = key_handler, "located key handler");

    let mut sites = vec![
        PatchSite::new(find_unique(image, &sigs.init_scancode)?, SiteRole::InitWrite),
        PatchSite::new(find_unique(image, &sigs.write_scancode)?, SiteRole::SingleWrite),
    ];
    for offset in find_all(image, &sigs.read_scancode)? {
        sites.push(PatchSite::new(offset, SiteRole::Read));
    }
    let round_message = find_unique(image, &sigs.round_message)?;
    sites.push(PatchSite::new(
        round_message + ROUND_MESSAGE_SITE_SKIP,
        SiteRole::BranchAfterJump,
    ));
    for site in &sites {
        debug!(offset = site.offset, role = ?site.role, "located patch site");
    }

    let up_flag_operand = find_unique(image, &sigs.read_up_flag)? + UP_FLAG_OPERAND_SKIP;

    Ok(LocatedSites {
        key_handler,
        sites,
        up_flag_operand,
    })
}

fn build_plan(profile: &VersionProfile, located: &LocatedSites) -> PatchPlan {
    let mut plan = PatchPlan::default();
    plan.add(
        profile.ds_init_offset..profile.ds_init_offset + 2,
        "data segment word",
    );
    for site in &located.sites {
        plan.add(site.range(), format!("{:?} site", site.role));
    }
    plan.add(
        located.up_flag_operand..located.up_flag_operand + 2,
        "movement fix operand",
    );
    for (idx, row) in profile.version_box.rows().into_iter().enumerate() {
        plan.add(row..row + BOX_WIDTH, format!("version box row {idx}"));
    }
    plan
}

/// Applies the keyboard fix to an unpatched `ROUND42.COM` image.
///
/// Nothing is written anywhere; the caller decides what to do with the
/// returned image and module.
///
/// # Errors
/// Returns `PatchError` when the image is not a known release, a signature is
/// missing or ambiguous, patch ranges collide, or the module cannot be built.
pub fn patch_image(
    mut image: Vec<u8>,
    builder: &dyn ModuleBuilder,
) -> Result<PatchOutcome, PatchError> {
    let profile = recognize(image.len())?;
    info!(version = profile.name, size = image.len(), "recognized game image");
    let mut progress = Progress::start();

    let located = locate_sites(&image, profile)?;
    build_plan(profile, &located).validate(image.len())?;
    progress.advance(Stage::SitesLocated);

    let params = BuildParams {
        image_size: image.len(),
        key_handler: located.key_handler,
    };
    let module = builder.build(&params)?;
    progress.advance(Stage::ModuleBuilt);

    let footer = *module.footer();
    debug!(?footer, module_len = module.len(), "extension module footer");
    progress.advance(Stage::FooterParsed);

    let layout = SegmentLayout {
        load_base: COM_LOAD_BASE,
        image_len: image.len(),
        module_len: module.len(),
        vars_size: footer.vars_size,
        ds_init_offset: profile.ds_init_offset,
    };
    let segment_fix = plan_segment_fix(&layout, &image)?;
    segment_fix.apply(&mut image)?;
    if segment_fix.is_noop() {
        info!(ds = segment_fix.old_value, "data segment already clear of module");
    } else {
        warn!(
            old = segment_fix.old_value,
            new = segment_fix.new_value,
            overlap = segment_fix.overlap,
            "moved data segment above extension module"
        );
    }
    progress.advance(Stage::SegmentFixed);

    let mut patched = Vec::with_capacity(located.sites.len());
    for site in &located.sites {
        let target = site.role.target(&footer);
        apply_call(&mut image, site.offset, site.width, target)?;
        patched.push(PatchedSite {
            site: *site,
            target,
        });
    }
    let operand = increment_word(&mut image, located.up_flag_operand)?;
    debug!(offset = located.up_flag_operand, operand, "applied movement fix");
    info!(sites = patched.len(), "redirected scancode accesses");
    progress.advance(Stage::SitesPatched);

    apply_version_box(&mut image, &profile.version_box)?;
    progress.advance(Stage::CosmeticsApplied);

    Ok(PatchOutcome {
        image,
        module,
        report: PatchReport {
            profile: profile.name,
            key_handler: located.key_handler,
            segment_fix,
            sites: patched,
            up_flag_operand: located.up_flag_operand,
        },
        progress,
    })
}

/// Patches `<input_dir>/ROUND42.COM` into `<output_dir>/ROUND42.COM` using NASM.
///
/// # Errors
/// Returns an error when reading, patching, or writing fails. No output is
/// written unless patching succeeded.
pub fn run(args: Args) -> anyhow::Result<()> {
    run_with_builder(&args, &NasmBuilder::from_env())?;
    Ok(())
}

/// Writes `bytes` to `<dir>/ROUND42.COM` through a staging file, so a failed
/// write never leaves a truncated game behind.
fn write_game(dir: &Path, bytes: &[u8]) -> Result<PathBuf, PatchError> {
    let output = dir.join(GAME_FILE_NAME);
    let staging = dir.join(format!("{GAME_FILE_NAME}{STAGING_SUFFIX}"));
    if let Err(err) = fs::write(&staging, bytes) {
        let _ = fs::remove_file(&staging);
        return Err(err.into());
    }
    fs::rename(&staging, &output)?;
    Ok(output)
}

/// Same as [`run`] with the module supplied by `builder`.
///
/// # Errors
/// Returns an error when reading, patching, or writing fails. File system
/// failures carry a [`PatchError::Io`].
pub fn run_with_builder(args: &Args, builder: &dyn ModuleBuilder) -> anyhow::Result<PatchReport> {
    let input = args.input_dir.join(GAME_FILE_NAME);
    let image = fs::read(&input)
        .map_err(PatchError::from)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let outcome = patch_image(image, builder)
        .with_context(|| format!("failed to patch {}", input.display()))?;
    let report = outcome.report().clone();
    let mut progress = outcome.progress;

    fs::create_dir_all(&args.output_dir)
        .map_err(PatchError::from)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;
    let output = write_game(&args.output_dir, &outcome.into_bytes()).with_context(|| {
        format!(
            "failed to write {}",
            args.output_dir.join(GAME_FILE_NAME).display()
        )
    })?;
    progress.advance(Stage::Written);
    info!(
        version = report.profile,
        output = %output.display(),
        "wrote patched game"
    );
    Ok(report)
}
