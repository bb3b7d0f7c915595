//! Presentation assembler: fills template slides with content records and
//! returns the finished package.

use crate::editor::{remove_shape, set_text};
use crate::image::{bind_image, MediaNamer};
use crate::manifest;
use crate::multiplier::{self, Reconciliation};
use crate::package::{slide_part, slide_rels_part, PartStore, CONTENT_TYPES_PART};
use crate::rels;
use slidefill_core::{
    Binding, BindingTable, ContentRecord, Error, Result, ShapeRole, TextPreparer, MAX_SLOTS,
};
use std::collections::HashMap;

/// Assembly settings.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Language tag written on every injected run.
    pub lang: String,
    /// Stem of media file names (`{stem}{n}.{ext}`).
    pub media_stem: String,
    /// Drop speaker-notes relationships from output slides.
    pub strip_notes: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            lang: "en-US".to_string(),
            media_stem: "slidefill_image".to_string(),
            strip_notes: true,
        }
    }
}

impl AssemblyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_media_stem(mut self, stem: impl Into<String>) -> Self {
        self.media_stem = stem.into();
        self
    }

    pub fn with_strip_notes(mut self, strip: bool) -> Self {
        self.strip_notes = strip;
        self
    }
}

/// Markup of one template slide and its relationship table.
#[derive(Debug, Clone)]
struct TemplatePart {
    slide: String,
    rels: String,
}

/// Template slides used by a single assembly, loaded before any output is
/// written so output parts never shadow the templates they came from.
#[derive(Debug, Default)]
struct TemplateCache {
    parts: HashMap<u32, TemplatePart>,
}

impl TemplateCache {
    fn load(store: &PartStore, records: &[ContentRecord], bindings: &BindingTable) -> Self {
        let mut cache = Self::default();
        let mut missing = Vec::new();

        for binding in records.iter().filter_map(|r| bindings.get(&r.type_tag)) {
            let number = binding.template_slide_number;
            if cache.parts.contains_key(&number) || missing.contains(&number) {
                continue;
            }

            let slide = match store.read_string(&slide_part(number)) {
                Ok(Some(slide)) => slide,
                Ok(None) => {
                    log::warn!("Template slide {} is not in the archive", number);
                    missing.push(number);
                    continue;
                }
                Err(e) => {
                    log::warn!("Template slide {} is unreadable: {}", number, e);
                    missing.push(number);
                    continue;
                }
            };
            let rels = match store.read_string(&slide_rels_part(number)) {
                Ok(Some(rels)) => rels,
                Ok(None) => rels::empty_table(),
                Err(e) => {
                    log::warn!("Template slide {} relationships are unreadable: {}", number, e);
                    missing.push(number);
                    continue;
                }
            };
            if let Err(e) = rels::validate(&rels) {
                log::warn!(
                    "Template slide {} has an unusable relationship table: {}",
                    number,
                    e
                );
                missing.push(number);
                continue;
            }

            log::debug!("Cached template slide {}", number);
            cache.parts.insert(number, TemplatePart { slide, rels });
        }

        cache
    }

    fn get(&self, number: u32) -> Option<&TemplatePart> {
        self.parts.get(&number)
    }
}

/// Summary of one assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Ids of the records that produced slides, in output order.
    pub slides: Vec<String>,
    /// Ids of records skipped for lack of a binding or template slide.
    pub skipped: Vec<String>,
    /// Media part names added to the package.
    pub media: Vec<String>,
    /// Metadata changes made by the final pass.
    pub reconciliation: Reconciliation,
}

/// Drives slide filling for a sequence of content records.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    options: AssemblyOptions,
    preparer: TextPreparer,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: AssemblyOptions) -> Self {
        self.options = options;
        self
    }

    /// Assemble a presentation and return the archive bytes.
    pub fn assemble(
        &self,
        template: &[u8],
        records: &[ContentRecord],
        bindings: &BindingTable,
    ) -> Result<Vec<u8>> {
        let (store, _) = self.assemble_package(template, records, bindings)?;
        store.to_bytes()
    }

    /// Assemble a presentation into a part store.
    ///
    /// Fails with `ArchiveCorrupt` when the template cannot be opened and
    /// with `EmptyResult` when no record produced a slide. Everything else
    /// degrades to omitted content.
    pub fn assemble_package(
        &self,
        template: &[u8],
        records: &[ContentRecord],
        bindings: &BindingTable,
    ) -> Result<(PartStore, AssemblyReport)> {
        let mut store = PartStore::from_bytes(template)?;
        store.require_package_parts()?;

        let cache = TemplateCache::load(&store, records, bindings);
        let mut content_types = store.read_required(CONTENT_TYPES_PART)?;
        let mut namer = MediaNamer::new(self.options.media_stem.clone());
        let mut report = AssemblyReport::default();

        for record in records {
            let Some(binding) = bindings.get(&record.type_tag) else {
                log::warn!(
                    "Record {}: no binding for type \"{}\"; skipped",
                    record.id,
                    record.type_tag
                );
                report.skipped.push(record.id.clone());
                continue;
            };
            let Some(template) = cache.get(binding.template_slide_number) else {
                log::warn!(
                    "Record {}: template slide {} is missing; skipped",
                    record.id,
                    binding.template_slide_number
                );
                report.skipped.push(record.id.clone());
                continue;
            };

            let number = report.slides.len() as u32 + 1;
            let slide = self.fill_slide(template, record, binding, &mut store, &mut content_types, &mut namer)?;

            store.write(slide_part(number), slide.markup);
            store.write(slide_rels_part(number), slide.rels);
            report.media.extend(slide.media);
            report.slides.push(record.id.clone());

            log::info!(
                "Slide {}: record {} from template slide {}",
                number,
                record.id,
                binding.template_slide_number
            );
        }

        if report.slides.is_empty() {
            return Err(Error::EmptyResult {
                records: records.len(),
            });
        }

        store.write(CONTENT_TYPES_PART, content_types);
        report.reconciliation = multiplier::reconcile(&mut store, report.slides.len() as u32)?;

        log::info!(
            "Assembled {} slide(s) from {} record(s); {} skipped, {} image(s) placed",
            report.slides.len(),
            records.len(),
            report.skipped.len(),
            report.media.len()
        );
        Ok((store, report))
    }

    fn fill_slide(
        &self,
        template: &TemplatePart,
        record: &ContentRecord,
        binding: &Binding,
        store: &mut PartStore,
        content_types: &mut String,
        namer: &mut MediaNamer,
    ) -> Result<FilledSlide> {
        let lang = self.options.lang.as_str();
        let mut markup = template.slide.clone();
        let mut rels = if self.options.strip_notes {
            multiplier::strip_notes(&template.rels)?
        } else {
            template.rels.clone()
        };

        let mut texts: Vec<(ShapeRole, Vec<String>)> = Vec::new();
        if let Some(lines) = self.preparer.field(&record.title) {
            texts.push((ShapeRole::Title, lines));
        }
        if let Some(lines) = record.header.as_deref().and_then(|h| self.preparer.field(h)) {
            texts.push((ShapeRole::Header, lines));
        }
        for (slot, role) in ShapeRole::LABELS.into_iter().enumerate() {
            if let Some(lines) = record.label(slot).and_then(|l| self.preparer.field(l)) {
                texts.push((role, lines));
            }
        }
        let body = self.preparer.body(&record.fragments);
        if !body.is_empty() {
            texts.push((ShapeRole::Body, body));
        }
        if let Some(table) = record.tables.first().filter(|t| !t.is_empty()) {
            let rows = self.preparer.table(table);
            if !rows.is_empty() {
                texts.push((ShapeRole::Table, rows));
            }
        }

        for (role, lines) in &texts {
            if let Some(shape) = binding.shape(*role) {
                markup = set_text(&markup, shape, lines, lang);
            }
        }

        let mut supplied = [false; MAX_SLOTS];
        let mut media = Vec::new();
        for (slot, role) in ShapeRole::IMAGES.into_iter().enumerate() {
            let Some(shape) = binding.shape(role) else { continue };
            let Some(image) = record.image(slot) else { continue };
            let Some(data) = image.data.clone() else { continue };
            // The record supplied this slot, so its caption stays even if
            // the image shape turns out to be missing.
            supplied[slot] = true;

            let Some(bound) = bind_image(&markup, &rels, shape, data, &image.locator, namer, store)? else {
                continue;
            };
            markup = bound.markup;
            rels = bound.rels;
            *content_types = manifest::ensure_default(
                content_types,
                bound.media.extension,
                manifest::image_content_type(bound.media.extension),
            )?;
            media.push(bound.media.part_name.clone());
            store.write(bound.media.part_name, bound.media.data);
        }

        for (slot, role) in ShapeRole::IMAGES.into_iter().enumerate() {
            if supplied[slot] {
                continue;
            }
            let Some(shape) = binding.shape(role) else { continue };
            markup = remove_shape(&markup, shape);
            if let Some(caption) = role.dependent_caption().and_then(|c| binding.shape(c)) {
                markup = remove_shape(&markup, caption);
            }
        }

        Ok(FilledSlide { markup, rels, media })
    }
}

/// Output of filling one template slide.
struct FilledSlide {
    markup: String,
    rels: String,
    media: Vec<String>,
}
