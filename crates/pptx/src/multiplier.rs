//! Slide multiplier: keeps the slide-order list, the presentation
//! relationship table and the manifest consistent with the output slides.
//!
//! All identifiers are recomputed from the current markup on each step.

use crate::manifest::{self, RELS_CONTENT_TYPE, SLIDE_CONTENT_TYPE};
use crate::package::{
    slide_part, slide_rels_part, PartStore, CONTENT_TYPES_PART, PRESENTATION_PART,
    PRESENTATION_RELS_PART,
};
use crate::rels::{self, Relationship, NOTES_SLIDE_REL_TYPE, SLIDE_REL_TYPE};
use regex::Regex;
use slidefill_core::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Slide ids below this floor are never allocated.
const MIN_SLIDE_ID: u64 = 256;

static SLD_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<p:sldId\b[^>]*?/>"#).unwrap());

static NUMERIC_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bid\s*=\s*"(\d+)""#).unwrap());

static REL_REF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\br:id\s*=\s*"([^"]+)""#).unwrap());

/// One `p:sldId` entry of the slide-order list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideIdEntry {
    pub id: u64,
    pub rel_id: String,
    /// Byte span of the element in `presentation.xml`.
    span: std::ops::Range<usize>,
}

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Slide numbers newly registered.
    pub added: Vec<u32>,
    /// Template slide numbers removed from the package.
    pub removed: Vec<u32>,
    /// Notes parts removed because no slide referenced them.
    pub orphaned_notes: Vec<String>,
}

/// The three global metadata parts, edited together.
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    pub presentation: String,
    pub rels: String,
    pub manifest: String,
}

impl PackageMetadata {
    /// Load the metadata parts; all three must exist.
    pub fn load(store: &PartStore) -> Result<Self> {
        Ok(Self {
            presentation: store.read_required(PRESENTATION_PART)?,
            rels: store.read_required(PRESENTATION_RELS_PART)?,
            manifest: store.read_required(CONTENT_TYPES_PART)?,
        })
    }

    /// Write the metadata parts back.
    pub fn store(self, store: &mut PartStore) {
        store.write(PRESENTATION_PART, self.presentation);
        store.write(PRESENTATION_RELS_PART, self.rels);
        store.write(CONTENT_TYPES_PART, self.manifest);
    }

    /// Entries of the slide-order list, in document order.
    pub fn slide_ids(&self) -> Vec<SlideIdEntry> {
        slide_id_entries(&self.presentation)
    }

    /// Map of presentation relationship id to slide number.
    pub fn slide_relationships(&self) -> Result<HashMap<String, u32>> {
        Ok(rels::parse(&self.rels)?
            .iter()
            .filter_map(|r| rels::slide_target_number(r).map(|n| (r.id.clone(), n)))
            .collect())
    }

    /// Slide numbers in presentation order.
    pub fn slide_order(&self) -> Result<Vec<u32>> {
        let targets = self.slide_relationships()?;
        Ok(self
            .slide_ids()
            .iter()
            .filter_map(|e| targets.get(&e.rel_id).copied())
            .collect())
    }

    /// Next unused slide id: one past the largest listed id, at least 257.
    pub fn next_slide_id(&self) -> u64 {
        self.slide_ids()
            .iter()
            .map(|e| e.id)
            .max()
            .unwrap_or(MIN_SLIDE_ID)
            .max(MIN_SLIDE_ID)
            + 1
    }

    /// Register slide `number`: slide-order entry, slide relationship and
    /// manifest overrides. Returns `false` when it was already registered.
    pub fn register_slide(&mut self, number: u32) -> Result<bool> {
        let registered = self.slide_relationships()?.values().any(|&n| n == number);
        if !registered {
            let (rels, rel_id) = rels::append_new(
                &self.rels,
                SLIDE_REL_TYPE,
                &format!("slides/slide{}.xml", number),
            )?;
            self.rels = rels;

            let entry = format!(r#"<p:sldId id="{}" r:id="{}"/>"#, self.next_slide_id(), rel_id);
            self.presentation = append_slide_id(&self.presentation, &entry)?;
        }

        let part = slide_part(number);
        if !manifest::has_override(&self.manifest, &part) {
            self.manifest = manifest::add_override(&self.manifest, &part, SLIDE_CONTENT_TYPE)?;
            self.manifest =
                manifest::add_override(&self.manifest, &slide_rels_part(number), RELS_CONTENT_TYPE)?;
        }

        Ok(!registered)
    }

    /// Drop every trace of slide `number` from the metadata.
    pub fn unregister_slide(&mut self, number: u32) -> Result<()> {
        let rel_ids: HashSet<String> = self
            .slide_relationships()?
            .into_iter()
            .filter(|&(_, n)| n == number)
            .map(|(id, _)| id)
            .collect();

        for entry in self.slide_ids().into_iter().rev() {
            if rel_ids.contains(&entry.rel_id) {
                self.presentation.replace_range(entry.span, "");
            }
        }
        self.rels = rels::retain(&self.rels, |r| !rel_ids.contains(&r.id))?;
        self.manifest = manifest::remove_override(&self.manifest, &slide_part(number));
        self.manifest = manifest::remove_override(&self.manifest, &slide_rels_part(number));
        Ok(())
    }

    /// Rewrite the slide-order list so entries follow slide-number order.
    ///
    /// Leaves the markup untouched when the order is already correct.
    pub fn sort_slide_ids(&mut self) -> Result<()> {
        let targets = self.slide_relationships()?;
        let entries = self.slide_ids();
        let key = |e: &SlideIdEntry| targets.get(&e.rel_id).copied().unwrap_or(u32::MAX);

        if entries.windows(2).all(|w| key(&w[0]) <= key(&w[1])) {
            return Ok(());
        }

        let mut sorted = entries.clone();
        sorted.sort_by_key(key);
        let texts: Vec<String> = sorted
            .iter()
            .map(|e| self.presentation[e.span.clone()].to_string())
            .collect();

        // Replace back to front so earlier spans stay valid.
        for (entry, text) in entries.iter().zip(texts.iter()).rev() {
            self.presentation.replace_range(entry.span.clone(), text);
        }
        Ok(())
    }
}

/// Make the package hold exactly slides `1..=count`, in order.
///
/// Registers slides that are missing from the metadata, removes template
/// slides numbered above `count`, and drops notes parts no slide refers to.
pub fn reconcile(store: &mut PartStore, count: u32) -> Result<Reconciliation> {
    let mut meta = PackageMetadata::load(store)?;
    let mut outcome = Reconciliation::default();

    let mut stale: Vec<u32> = meta
        .slide_relationships()?
        .values()
        .copied()
        .chain(store.part_names().filter_map(slide_number_of_part))
        .filter(|&n| n > count)
        .collect();
    stale.sort_unstable();
    stale.dedup();

    for &number in &stale {
        meta.unregister_slide(number)?;
        store.remove(&slide_part(number));
        store.remove(&slide_rels_part(number));
        log::debug!("Removed unused template slide {}", number);
    }
    outcome.removed = stale;

    for number in 1..=count {
        if meta.register_slide(number)? {
            outcome.added.push(number);
        }
    }
    meta.sort_slide_ids()?;

    outcome.orphaned_notes = prune_orphan_notes(store, &mut meta)?;
    meta.store(store);

    log::debug!(
        "Package metadata reconciled: {} slide(s) added, {} removed",
        outcome.added.len(),
        outcome.removed.len()
    );
    Ok(outcome)
}

/// Remove notes slides that no slide relationship points to.
fn prune_orphan_notes(store: &mut PartStore, meta: &mut PackageMetadata) -> Result<Vec<String>> {
    let mut referenced = HashSet::new();
    let slide_rels: Vec<String> = store
        .part_names()
        .filter(|n| n.starts_with("ppt/slides/_rels/") && n.ends_with(".xml.rels"))
        .map(str::to_string)
        .collect();
    for rels_name in &slide_rels {
        let Some(table) = store.read_string(rels_name)? else { continue };
        let source = rels_name.replace("_rels/", "").trim_end_matches(".rels").to_string();
        for rel in rels::parse(&table)? {
            if rel.rel_type == NOTES_SLIDE_REL_TYPE {
                referenced.insert(rels::resolve_target(&source, &rel.target));
            }
        }
    }

    let orphans: Vec<String> = store
        .part_names()
        .filter(|n| n.starts_with("ppt/notesSlides/notesSlide") && n.ends_with(".xml"))
        .filter(|n| !referenced.contains(*n))
        .map(str::to_string)
        .collect();

    for part in &orphans {
        store.remove(part);
        store.remove(&rels::rels_part_for(part));
        meta.manifest = manifest::remove_override(&meta.manifest, part);
        log::debug!("Removed orphaned notes part {}", part);
    }
    Ok(orphans)
}

/// Slide number of a `ppt/slides/slideN.xml` part name.
fn slide_number_of_part(name: &str) -> Option<u32> {
    let file = name.strip_prefix("ppt/slides/")?;
    if file.contains('/') || !file.starts_with("slide") || !file.ends_with(".xml") {
        return None;
    }
    rels::extract_slide_number(file)
}

fn slide_id_entries(presentation: &str) -> Vec<SlideIdEntry> {
    SLD_ID_REGEX
        .find_iter(presentation)
        .filter_map(|m| {
            let tag = m.as_str();
            let id = NUMERIC_ID_REGEX.captures(tag)?[1].parse().ok()?;
            let rel_id = REL_REF_REGEX.captures(tag)?[1].to_string();
            Some(SlideIdEntry {
                id,
                rel_id,
                span: m.range(),
            })
        })
        .collect()
}

/// Append a `p:sldId` element to the slide-order list, creating the list
/// when the presentation has none.
fn append_slide_id(presentation: &str, entry: &str) -> Result<String> {
    if let Some(pos) = presentation.find("</p:sldIdLst>") {
        return Ok(format!("{}{}{}", &presentation[..pos], entry, &presentation[pos..]));
    }
    if let Some(pos) = presentation.find("<p:sldIdLst/>") {
        return Ok(format!(
            "{}<p:sldIdLst>{}</p:sldIdLst>{}",
            &presentation[..pos],
            entry,
            &presentation[pos + "<p:sldIdLst/>".len()..]
        ));
    }

    // The list sits after the master lists and before the slide size.
    let anchor = ["<p:sldSz", "<p:notesSz"]
        .iter()
        .find_map(|m| presentation.find(m))
        .ok_or_else(|| {
            Error::ArchiveCorrupt("presentation.xml has no slide list and no slide size".into())
        })?;
    Ok(format!(
        "{}<p:sldIdLst>{}</p:sldIdLst>{}",
        &presentation[..anchor],
        entry,
        &presentation[anchor..]
    ))
}

/// Relationships of a slide with speaker-notes links removed.
pub fn strip_notes(slide_rels: &str) -> Result<String> {
    rels::retain(slide_rels, |r: &Relationship| r.rel_type != NOTES_SLIDE_REL_TYPE)
}
