use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub indexing: Indexing,
	#[serde(default)]
	pub prompts: Prompts,
	#[serde(default)]
	pub metadata: MetadataFields,
	#[serde(default)]
	pub query_parsing: QueryParsing,
	#[serde(default)]
	pub skill_normalization: SkillNormalization,
	#[serde(default)]
	pub ranking: Ranking,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	/// Either "qdrant" or "memory".
	#[serde(default = "default_storage_backend")]
	pub backend: String,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// May be empty for local runtimes that do not authenticate.
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub limit: u32,
	pub content_preview_chars: usize,
	pub structured_max_attempts: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { limit: 6, content_preview_chars: 200, structured_max_attempts: 2 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Indexing {
	pub candidates_dir: PathBuf,
	pub primary_skills_max_count: usize,
	pub strong_skill_levels: Vec<String>,
}
impl Default for Indexing {
	fn default() -> Self {
		Self {
			candidates_dir: PathBuf::from("data/candidates"),
			primary_skills_max_count: 5,
			strong_skill_levels: vec![
				"High".to_string(),
				"Very High".to_string(),
				"VeryHigh".to_string(),
			],
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
	pub system: String,
	/// Rendered as the user turn. `{input}` is required; `{context}` is optional.
	pub human: String,
}
impl Default for Prompts {
	fn default() -> Self {
		Self {
			system: "You are a recruiting assistant. Candidate profiles are provided in ranked order, \
best match first. Using only facts from those profiles, explain why the first candidate fits the \
request. Respond with a single JSON object of the form {\"justification\": \"...\"}."
				.to_string(),
			human: "Request: {input}".to_string(),
		}
	}
}

/// Metadata keys written at indexing time and read back during retrieval.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MetadataFields {
	pub doc_type: String,
	pub candidate_id: String,
	pub fullname: String,
	pub seniority_level: String,
	pub years_experience: String,
	pub relevant_years: String,
	pub main_industry: String,
	pub english_level: String,
	pub english_level_num: String,
	pub primary_skills: String,
	pub skill_name: String,
	pub skill_level: String,
	pub prepared: String,
	pub candidate_type: String,
	pub skill_type: String,
}
impl Default for MetadataFields {
	fn default() -> Self {
		Self {
			doc_type: "type".to_string(),
			candidate_id: "candidate_id".to_string(),
			fullname: "fullname".to_string(),
			seniority_level: "seniority_level".to_string(),
			years_experience: "years_experience".to_string(),
			relevant_years: "relevant_years".to_string(),
			main_industry: "main_industry".to_string(),
			english_level: "english_level".to_string(),
			english_level_num: "english_level_num".to_string(),
			primary_skills: "primary_skills".to_string(),
			skill_name: "skill_name".to_string(),
			skill_level: "skill_level".to_string(),
			prepared: "prepared".to_string(),
			candidate_type: "candidate".to_string(),
			skill_type: "skill".to_string(),
		}
	}
}

/// Lookup tables for query parsing. Every list is ordered and the first match wins.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QueryParsing {
	pub intents: Vec<IntentKeywords>,
	pub technology_synonyms: Vec<TechnologySynonym>,
	pub seniority_tokens: Vec<SeniorityTokens>,
	pub experience_patterns: Vec<String>,
}
impl Default for QueryParsing {
	fn default() -> Self {
		Self {
			intents: vec![
				IntentKeywords::new(
					"find_best",
					&["best", "top", "most qualified", "ideal", "perfect", "strongest"],
				),
				IntentKeywords::new("list_all", &["list", "all", "show me", "find all", "get all"]),
				IntentKeywords::new(
					"compare",
					&["compare", "comparison", "versus", "vs", "difference between"],
				),
				IntentKeywords::new("explain", &["explain", "why", "how", "what makes", "reasoning"]),
			],
			technology_synonyms: [
				("js", "JavaScript"),
				("javascript", "JavaScript"),
				("ts", "TypeScript"),
				("typescript", "TypeScript"),
				("py", "Python"),
				("python", "Python"),
				("k8s", "Kubernetes"),
				("react", "React"),
				("reactjs", "React"),
				("vue", "Vue"),
				("vuejs", "Vue"),
				("angular", "Angular"),
				("angularjs", "Angular"),
				("node", "Node.js"),
				("nodejs", "Node.js"),
				("node.js", "Node.js"),
				("dotnet", ".NET"),
				("csharp", "C#"),
				("c#", "C#"),
				("java", "Java"),
				("golang", "Go"),
				("postgres", "PostgreSQL"),
				("postgresql", "PostgreSQL"),
				("mongo", "MongoDB"),
				("mongodb", "MongoDB"),
				("docker", "Docker"),
				("kubernetes", "Kubernetes"),
				("aws", "AWS"),
				("azure", "Azure"),
				("gcp", "Google Cloud"),
			]
			.into_iter()
			.map(|(token, canonical)| TechnologySynonym {
				token: token.to_string(),
				canonical: canonical.to_string(),
			})
			.collect(),
			seniority_tokens: vec![
				SeniorityTokens::new("Intern", &["intern", "internship", "trainee"]),
				SeniorityTokens::new("Junior", &["junior", "jr", "entry level", "entry-level"]),
				SeniorityTokens::new("Mid", &["mid", "mid-level", "intermediate"]),
				SeniorityTokens::new("Senior", &["senior", "sr", "advanced"]),
				SeniorityTokens::new(
					"Lead",
					&["lead", "tech lead", "team lead", "technical lead"],
				),
				SeniorityTokens::new("Principal", &["principal", "staff engineer"]),
				SeniorityTokens::new("Staff", &["staff", "architect"]),
			],
			experience_patterns: vec![
				r"(\d+)\+?\s*(?:years?|yrs?)".to_string(),
				r"at least (\d+)\s*(?:years?|yrs?)".to_string(),
				r"minimum (\d+)\s*(?:years?|yrs?)".to_string(),
				r"min (\d+)\s*(?:years?|yrs?)".to_string(),
				r"(\d+)\s*(?:years?|yrs?)\s*(?:of\s*)?(?:experience|exp)".to_string(),
			],
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct IntentKeywords {
	/// One of find_best, list_all, compare, or explain.
	pub intent: String,
	pub keywords: Vec<String>,
}
impl IntentKeywords {
	fn new(intent: &str, keywords: &[&str]) -> Self {
		Self {
			intent: intent.to_string(),
			keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct TechnologySynonym {
	pub token: String,
	pub canonical: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SeniorityTokens {
	/// A seniority label such as "Senior"; case-sensitive.
	pub level: String,
	pub tokens: Vec<String>,
}
impl SeniorityTokens {
	fn new(level: &str, tokens: &[&str]) -> Self {
		Self {
			level: level.to_string(),
			tokens: tokens.iter().map(|token| token.to_string()).collect(),
		}
	}
}

/// Ordered rewrite rules. Specific patterns must precede generic ones.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SkillNormalization {
	pub rules: Vec<SkillRule>,
}
impl Default for SkillNormalization {
	fn default() -> Self {
		let rules = [
			(r"Java\s*\d*\.?\d*", "Java"),
			(r"Java\s*\([^)]+\)", "Java"),
			(r".*\bJava\b.*", "Java"),
			(r"JavaScript.*", "JavaScript"),
			(r"JS\s*\(.*\)", "JavaScript"),
			(r"Python\s*\d*\.?\d*", "Python"),
			(r"C#.*", "C#"),
			(r"CSharp.*", "C#"),
			(r"TypeScript.*", "TypeScript"),
			(r"TS\s*\(.*\)", "TypeScript"),
			(r"React.*", "React"),
			(r"Angular.*", "Angular"),
			(r"Spring\s*\([^)]+\)", "Spring"),
			(r"Spring\s+\w+", "Spring"),
			(r"ASP\.NET.*", "ASP.NET"),
			(r"\.NET.*", ".NET"),
			(r"Node\.?js.*", "Node.js"),
			(r"Postgre(?:SQL|s).*", "PostgreSQL"),
			(r"SQL\s*\([^)]+\)", "SQL"),
			(r".*SQL", "SQL"),
			(r"Docker.*", "Docker"),
			(r"Kubernetes.*", "Kubernetes"),
			(r"K8s", "Kubernetes"),
			(r"Git.*", "Git"),
		];

		Self {
			rules: rules
				.into_iter()
				.map(|(pattern, canonical)| SkillRule {
					pattern: pattern.to_string(),
					canonical: canonical.to_string(),
				})
				.collect(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct SkillRule {
	/// Matched against the whole trimmed skill name, case-insensitively.
	pub pattern: String,
	pub canonical: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub technical_weight: f64,
	pub seniority_weight: f64,
	pub leadership_weight: f64,
	pub experience_weight: f64,
	pub leadership_keyword_threshold: u32,
	pub max_seniority_delta: u32,
	pub max_leadership_contribution: f64,
	pub leadership_keywords: Vec<String>,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			technical_weight: 0.40,
			seniority_weight: 0.25,
			leadership_weight: 0.20,
			experience_weight: 0.15,
			leadership_keyword_threshold: 2,
			max_seniority_delta: 2,
			max_leadership_contribution: 0.5,
			leadership_keywords: ["lead", "principal", "staff", "manager", "director", "head", "architect"]
				.into_iter()
				.map(str::to_string)
				.collect(),
		}
	}
}

fn default_storage_backend() -> String {
	"qdrant".to_string()
}
