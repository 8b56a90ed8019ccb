//! Built-in keyword lists, one per category, in canonical (English) form.

use ragfolio_core::Category;

/// Categories in the order they are tested; the first match wins.
pub const MATCH_ORDER: [Category; 7] = [
    Category::Projects,
    Category::Experience,
    Category::Skills,
    Category::Education,
    Category::Certifications,
    Category::Achievements,
    Category::Profile,
];

pub fn default_keywords(category: Category) -> &'static [&'static str] {
    match category {
        Category::Projects => &["project", "portfolio", "application", "app", "product", "side project", "built"],
        Category::Experience => &[
            "work", "worked", "job", "company", "companies", "employer", "career", "position", "role",
            "mission", "internship", "apprenticeship", "professional",
        ],
        Category::Skills => &[
            "skill", "language", "languages", "programming", "coding", "framework", "frameworks",
            "technology", "technologies", "tool", "tools", "library", "libraries", "stack", "cloud",
            "infrastructure", "devops", "docker", "kubernetes", "ci/cd", "terraform", "expertise",
            "specialization", "specializations", "frontend", "backend", "database", "databases",
        ],
        Category::Education => &["degree", "diploma", "studies", "studied", "school", "university", "training"],
        Category::Certifications => &["certification", "certificate", "certificates", "certified", "badge", "accreditation"],
        Category::Achievements => &["achievement", "accomplishment", "accomplishments", "award", "awards", "success"],
        Category::Profile => &["about", "bio", "contact", "email", "github", "linkedin", "yourself", "who are you"],
    }
}
