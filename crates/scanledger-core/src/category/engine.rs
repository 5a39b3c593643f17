//! Category suggestion and rule learning.

use std::sync::Arc;

use scanledger_inference::{InferenceError, JsonGenerator};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::CategorySuggestion;
use super::cache::CategoryCatalog;
use super::keywords::{best_overlap, overlap_confidence, tokens};
use crate::error::{IngestError, Result};
use crate::models::{Category, ConfidenceScore, InvoiceLineItem, VendorCategoryRule, normalize_keyword};
use crate::repository::VendorRuleRepository;

/// Raw text beyond this many characters is cut before prompting.
const MAX_PROMPT_TEXT_CHARS: usize = 4000;

/// Confidence used when the model does not report one.
const DEFAULT_LLM_CONFIDENCE: f64 = 0.5;

const SYSTEM_PROMPT: &str = "You assign a spending category to an invoice or receipt.
Pick exactly one category from the list you are given and answer with a single JSON object:
  {\"categoryId\": \"<id from the list>\", \"categoryName\": \"<name from the list>\", \"confidence\": <0..1>, \"rationale\": \"<short reason>\"}
If none fits, answer with categoryId null.";

/// Suggests categories from learned rules, keyword overlap and the model,
/// in that order.
pub struct CategorySuggestionEngine {
    rules: Arc<dyn VendorRuleRepository>,
    catalog: Arc<dyn CategoryCatalog>,
    llm: Arc<dyn JsonGenerator>,
}

impl CategorySuggestionEngine {
    pub fn new(
        rules: Arc<dyn VendorRuleRepository>,
        catalog: Arc<dyn CategoryCatalog>,
        llm: Arc<dyn JsonGenerator>,
    ) -> Self {
        Self { rules, catalog, llm }
    }

    pub fn catalog(&self) -> &Arc<dyn CategoryCatalog> {
        &self.catalog
    }

    pub async fn suggest(
        &self,
        vendor_name: &str,
        raw_text: &str,
        line_items: &[InvoiceLineItem],
        cancel: &CancellationToken,
    ) -> Result<CategorySuggestion> {
        if let Some(suggestion) = self.from_rules(vendor_name, raw_text).await? {
            return Ok(suggestion);
        }

        let categories = self.catalog.get().await?;

        if let Some(suggestion) = from_keywords(&categories, vendor_name, raw_text, line_items) {
            return Ok(suggestion);
        }

        self.from_llm(&categories, vendor_name, raw_text, line_items, cancel).await
    }

    /// Create a rule for `keyword`, or reinforce the one already stored
    /// under the same normalized keyword.
    pub async fn learn(&self, keyword: &str, category_id: Uuid, confidence: f64) -> Result<VendorCategoryRule> {
        let confidence = ConfidenceScore::new(confidence)?;
        let normalized = normalize_keyword(keyword);

        let rule = match self.rules.find_by_keyword(&normalized).await? {
            Some(mut rule) => {
                debug!("Reinforcing rule '{}'", rule.normalized_keyword);
                rule.reinforce(category_id, confidence);
                rule
            }
            None => VendorCategoryRule::new(keyword, category_id, confidence)?,
        };

        self.rules.upsert(&rule).await?;
        info!("Learned rule '{}' -> {}", rule.normalized_keyword, category_id);
        Ok(rule)
    }

    async fn from_rules(&self, vendor_name: &str, raw_text: &str) -> Result<Option<CategorySuggestion>> {
        let vendor = normalize_keyword(vendor_name);
        let text = normalize_keyword(raw_text);

        let best = self
            .rules
            .list()
            .await?
            .into_iter()
            .filter(|rule| rule.matches(&vendor) || rule.matches(&text))
            .max_by(|a, b| a.confidence.value().total_cmp(&b.confidence.value()));

        let Some(mut rule) = best else {
            return Ok(None);
        };

        rule.touch();
        self.rules.upsert(&rule).await?;
        debug!("Rule '{}' matched", rule.normalized_keyword);

        let category_name = match self.catalog.get().await {
            Ok(categories) => categories
                .iter()
                .find(|c| c.id == rule.category_id)
                .map(|c| c.name.clone()),
            Err(e) => {
                warn!("Category lookup failed: {}", e);
                None
            }
        };

        Ok(Some(CategorySuggestion {
            category_id: Some(rule.category_id),
            category_name,
            confidence: rule.confidence,
            rationale: format!("learned rule '{}'", rule.keyword),
        }))
    }

    async fn from_llm(
        &self,
        categories: &[Category],
        vendor_name: &str,
        raw_text: &str,
        line_items: &[InvoiceLineItem],
        cancel: &CancellationToken,
    ) -> Result<CategorySuggestion> {
        if !self.llm.is_enabled() {
            return Err(IngestError::LlmRequired);
        }
        if categories.is_empty() {
            return Ok(CategorySuggestion::none("no categories defined"));
        }

        let prompt = user_prompt(categories, vendor_name, raw_text, line_items);
        let json = self.llm.generate_json(SYSTEM_PROMPT, &prompt, cancel).await?;
        let value: Value = serde_json::from_str(&json)
            .map_err(|e| InferenceError::Failed(format!("category answer is not JSON: {}", e)))?;

        let Some(category) = resolve_category(categories, &value) else {
            warn!("Model answer names no known category");
            return Ok(CategorySuggestion::none("model named no known category"));
        };

        let confidence = value
            .get("confidence")
            .and_then(Value::as_f64)
            .map(ConfidenceScore::saturating)
            .unwrap_or_else(|| ConfidenceScore::saturating(DEFAULT_LLM_CONFIDENCE));
        let rationale = value
            .get("rationale")
            .and_then(Value::as_str)
            .filter(|r| !r.trim().is_empty())
            .unwrap_or("language model")
            .trim()
            .to_string();

        Ok(CategorySuggestion {
            category_id: Some(category.id),
            category_name: Some(category.name.clone()),
            confidence,
            rationale,
        })
    }
}

fn from_keywords(
    categories: &[Category],
    vendor_name: &str,
    raw_text: &str,
    line_items: &[InvoiceLineItem],
) -> Option<CategorySuggestion> {
    let mut text_tokens = tokens(vendor_name);
    text_tokens.extend(tokens(raw_text));
    for item in line_items {
        text_tokens.extend(tokens(&item.description));
    }

    let (category, overlap) = best_overlap(categories, &text_tokens)?;
    Some(CategorySuggestion {
        category_id: Some(category.id),
        category_name: Some(category.name.clone()),
        confidence: ConfidenceScore::saturating(overlap_confidence(overlap)),
        rationale: format!("{} keyword(s) of '{}' found in the document", overlap, category.name),
    })
}

/// Category whose UUID the model answered with. Anything else, including a
/// bare name or a UUID missing from the catalog, names no category.
fn resolve_category<'a>(categories: &'a [Category], value: &Value) -> Option<&'a Category> {
    let id = value
        .get("categoryId")
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id.trim()).ok())?;
    categories.iter().find(|c| c.id == id)
}

fn user_prompt(categories: &[Category], vendor_name: &str, raw_text: &str, line_items: &[InvoiceLineItem]) -> String {
    let mut prompt = String::from("Categories:\n");
    for category in categories {
        match &category.description {
            Some(description) => prompt.push_str(&format!("- {} ({}): {}\n", category.name, category.id, description)),
            None => prompt.push_str(&format!("- {} ({})\n", category.name, category.id)),
        }
    }

    if !vendor_name.trim().is_empty() {
        prompt.push_str(&format!("\nVendor: {}\n", vendor_name.trim()));
    }
    if !line_items.is_empty() {
        prompt.push_str("\nItems:\n");
        for item in line_items {
            prompt.push_str(&format!("- {} ({})\n", item.description, item.amount));
        }
    }

    prompt.push_str("\nDocument text:\n");
    prompt.extend(raw_text.chars().take(MAX_PROMPT_TEXT_CHARS));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::cache::CategoryCatalogCache;
    use crate::error::ErrorKind;
    use crate::interpret::tests::CannedGenerator;
    use crate::repository::{CategoryRepository, MemoryRepositories};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct Fixture {
        repos: Arc<MemoryRepositories>,
        food: Category,
        travel: Category,
    }

    async fn fixture() -> Fixture {
        let repos = Arc::new(MemoryRepositories::new());
        let food = Category::new("Groceries");
        let travel = Category::new("Travel").with_description("Taxis, flights and hotels");
        CategoryRepository::insert(repos.as_ref(), food.clone()).await.unwrap();
        CategoryRepository::insert(repos.as_ref(), travel.clone()).await.unwrap();
        Fixture { repos, food, travel }
    }

    fn engine(fixture: &Fixture, llm: CannedGenerator) -> CategorySuggestionEngine {
        let catalog = Arc::new(CategoryCatalogCache::new(fixture.repos.clone(), Duration::from_secs(300)));
        CategorySuggestionEngine::new(fixture.repos.clone(), catalog, Arc::new(llm))
    }

    #[tokio::test]
    async fn test_rule_wins_and_is_touched() {
        let fx = fixture().await;
        let engine = engine(&fx, CannedGenerator::disabled());
        let weak = engine.learn("uber", fx.food.id, 0.3).await.unwrap();
        let mut strong = engine.learn("Über Trip", fx.travel.id, 0.9).await.unwrap();
        let long_ago = chrono::Utc::now() - chrono::Duration::days(30);
        strong.last_used_at = long_ago;
        fx.repos.upsert(&strong).await.unwrap();

        let suggestion = engine
            .suggest("UBER TRIP", "Uber trip 12/05/2024 R$ 23,90", &[], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(suggestion.category_id, Some(fx.travel.id));
        assert_eq!(suggestion.category_name.as_deref(), Some("Travel"));
        assert_eq!(suggestion.confidence.value(), 0.9);

        let stored = fx.repos.find_by_keyword("uber trip").await.unwrap().unwrap();
        assert!(stored.last_used_at > long_ago);
        let untouched = fx.repos.find_by_keyword("uber").await.unwrap().unwrap();
        assert_eq!(untouched.last_used_at, weak.last_used_at);
    }

    #[tokio::test]
    async fn test_learn_reinforces_existing_keyword() {
        let fx = fixture().await;
        let engine = engine(&fx, CannedGenerator::disabled());
        let first = engine.learn("Padaria São João", fx.food.id, 0.6).await.unwrap();
        let second = engine.learn("padaria sao  joao", fx.travel.id, 0.8).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.category_id, fx.travel.id);
        assert_eq!(VendorRuleRepository::list(fx.repos.as_ref()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_learn_rejects_bad_confidence() {
        let fx = fixture().await;
        let engine = engine(&fx, CannedGenerator::disabled());
        let err = engine.learn("uber", fx.travel.id, 1.2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_keyword_overlap() {
        let fx = fixture().await;
        let engine = engine(&fx, CannedGenerator::disabled());
        let items = vec![InvoiceLineItem {
            description: "Travel insurance".to_string(),
            amount: rust_decimal::Decimal::TEN,
            quantity: None,
        }];

        let suggestion = engine
            .suggest("Acme", "Policy 123", &items, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(suggestion.category_id, Some(fx.travel.id));
        assert_eq!(suggestion.confidence.value(), 0.55);
    }

    #[tokio::test]
    async fn test_llm_disabled_requires_llm() {
        let fx = fixture().await;
        let engine = engine(&fx, CannedGenerator::disabled());
        let err = engine
            .suggest("Acme", "nothing to see", &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LlmRequired);
    }

    #[tokio::test]
    async fn test_llm_answer_by_id() {
        let fx = fixture().await;
        let reply = format!(
            r#"{{"categoryId": "{}", "confidence": 0.7, "rationale": "supermarket"}}"#,
            fx.food.id
        );
        let llm = CannedGenerator::new(&[reply.as_str()]);
        let engine = engine(&fx, llm);

        let suggestion = engine
            .suggest("Acme", "arroz feijao", &[], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(suggestion.category_id, Some(fx.food.id));
        assert_eq!(suggestion.rationale, "supermarket");
    }

    #[tokio::test]
    async fn test_llm_answer_without_listed_uuid_is_no_suggestion() {
        let fx = fixture().await;
        let llm = CannedGenerator::new(&[
            r#"{"categoryId": "travel", "categoryName": "Travel", "confidence": 0.6}"#,
            r#"{"categoryId": "cat-7", "categoryName": "Pets"}"#,
            r#"{"categoryId": "6f1c2d4e-8a1b-4c3d-9e2f-0a1b2c3d4e5f", "categoryName": "Groceries"}"#,
        ]);
        let engine = engine(&fx, llm);
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            let suggestion = engine.suggest("Acme", "misc", &[], &cancel).await.unwrap();
            assert_eq!(suggestion.category_id, None);
            assert_eq!(suggestion.category_name, None);
        }
    }

    #[test]
    fn test_prompt_lists_categories() {
        let travel = Category::new("Travel").with_description("Taxis");
        let prompt = user_prompt(std::slice::from_ref(&travel), "Uber", "trip", &[]);
        assert!(prompt.contains(&format!("- Travel ({}): Taxis", travel.id)));
        assert!(prompt.contains("Vendor: Uber"));
    }
}
