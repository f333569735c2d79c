//! Full-text lead search over a Tantivy index.
//!
//! The index is derived data: it is rebuilt from the repository at startup
//! and kept current by the handlers after each write.

use std::path::Path;

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::models::{Lead, Tag};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// A matching lead id with its relevance score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub lead_id: String,
    pub score: f32,
}

struct LeadFields {
    id: Field,
    name: Field,
    phone: Field,
    email: Field,
    query: Field,
    source: Field,
    tag_names: Field,
}

impl LeadFields {
    fn schema() -> (Schema, Self) {
        let mut builder = Schema::builder();
        // Untokenized so a delete by id matches the whole value.
        let id = builder.add_text_field("lead_id", STRING | STORED);
        let fields = Self {
            id,
            name: builder.add_text_field("name", TEXT),
            phone: builder.add_text_field("phone", TEXT),
            email: builder.add_text_field("email", TEXT),
            query: builder.add_text_field("query", TEXT),
            source: builder.add_text_field("source", TEXT),
            tag_names: builder.add_text_field("tag_names", TEXT),
        };
        (builder.build(), fields)
    }

    /// Searchable fields and how much a match in each counts.
    fn boosted(&self) -> [(Field, f32); 6] {
        [
            (self.name, 10.0),
            (self.email, 8.0),
            (self.phone, 8.0),
            (self.query, 6.0),
            (self.tag_names, 4.0),
            (self.source, 2.5),
        ]
    }
}

/// Tantivy index over leads.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: LeadFields,
}

impl SearchIndex {
    /// Open the index at `index_path`, creating it if needed.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;
        let directory = MmapDirectory::open(index_path)
            .map_err(|e| AppError::Search(format!("Failed to open index directory: {}", e)))?;

        let (schema, fields) = LeadFields::schema();
        let index = Index::open_or_create(directory, schema)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer(WRITER_HEAP_BYTES)?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields,
        })
    }

    /// Replace the whole index with the given leads.
    pub async fn rebuild(&self, leads: &[Lead], tags: &[Tag]) -> Result<(), AppError> {
        let mut writer = self.writer.lock().await;

        writer.delete_all_documents()?;
        for lead in leads {
            writer.add_document(self.document(lead, tags))?;
        }
        self.commit(&mut writer)?;

        tracing::info!("Search index rebuilt with {} leads", leads.len());
        Ok(())
    }

    /// Index one lead, replacing any earlier version of it.
    pub async fn index_lead(&self, lead: &Lead, tags: &[Tag]) -> Result<(), AppError> {
        let mut writer = self.writer.lock().await;

        writer.delete_term(Term::from_field_text(self.fields.id, &lead.id));
        writer.add_document(self.document(lead, tags))?;
        self.commit(&mut writer)
    }

    pub async fn remove_lead(&self, lead_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.lock().await;

        writer.delete_term(Term::from_field_text(self.fields.id, lead_id));
        self.commit(&mut writer)
    }

    /// Best matches first. A blank query or a zero limit matches nothing.
    pub fn search(
        &self,
        text: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        if text.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let boosted = self.fields.boosted();
        let mut parser =
            QueryParser::for_index(&self.index, boosted.iter().map(|(f, _)| *f).collect());
        for (field, boost) in boosted {
            parser.set_field_boost(field, boost);
        }
        let query = parser
            .parse_query(text)
            .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?;

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit).and_offset(offset))?;

        top_docs
            .into_iter()
            .map(|(score, address)| -> Result<SearchHit, AppError> {
                let doc: TantivyDocument = searcher.doc(address)?;
                let lead_id = doc
                    .get_first(self.fields.id)
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| AppError::Search("Indexed lead has no id".to_string()))?;
                Ok(SearchHit {
                    lead_id: lead_id.to_string(),
                    score,
                })
            })
            .collect()
    }

    fn commit(&self, writer: &mut IndexWriter) -> Result<(), AppError> {
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    fn document(&self, lead: &Lead, tags: &[Tag]) -> TantivyDocument {
        let assigned = &lead.tags;
        let tag_names: Vec<&str> = [
            &assigned.course,
            &assigned.subject,
            &assigned.term,
            &assigned.faculty,
        ]
        .into_iter()
        .flatten()
        .chain(&assigned.custom)
        .filter_map(|id| tags.iter().find(|t| &t.id == id))
        .map(|t| t.name.as_str())
        .collect();

        doc!(
            self.fields.id => lead.id.as_str(),
            self.fields.name => lead.name.as_str(),
            self.fields.phone => lead.phone.as_str(),
            self.fields.email => lead.email.as_str(),
            self.fields.query => lead.query.as_str(),
            self.fields.source => lead.source.as_deref().unwrap_or_default(),
            self.fields.tag_names => tag_names.join(" ")
        )
    }
}
