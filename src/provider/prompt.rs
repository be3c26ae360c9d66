//! Deterministic query construction

/// Build the provider query for an entity
///
/// The same `(name, region)` always yields the same string, which keeps the
/// response cache key stable across runs.
pub fn build_prompt(name: &str, region: &str) -> String {
    format!(
        "Create a detailed directory of antique appraisers in {name}, {region}. Include:\n\
         \n\
         1. Overview of antique appraisal services in {name}\n\
         2. List as many antique appraisers as possible with their:\n   \
         - Name and business details\n   \
         - Specialties and expertise\n   \
         - Contact information\n   \
         - Years in business\n   \
         - Notable certifications\n\
         3. Service areas and typical pricing\n\
         4. Contact information and business hours\n\
         \n\
         Keep the response concise and factual."
    )
}
