//! Locally known portfolio data. Fallback payloads and tool validation are
//! derived from these tables, never from hardcoded counts.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: &'static str,
    pub title: &'static str,
    pub tags: &'static [&'static str],
    pub github: Option<&'static str>,
    pub featured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SocialLink {
    pub platform: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebTool {
    pub id: &'static str,
    pub name: &'static str,
    pub slug: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub path: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
}

pub const PROJECTS: &[Project] = &[
    Project {
        id: "project-1",
        title: "Interactive Data Visualization Dashboard",
        tags: &["SvelteKit", "Three.js", "TypeScript", "WebSocket"],
        github: Some("https://github.com/example/dashboard"),
        featured: true,
    },
    Project {
        id: "project-2",
        title: "E-Commerce Platform Redesign",
        tags: &["React", "Node.js", "PostgreSQL", "Stripe"],
        github: Some("https://github.com/example/ecommerce"),
        featured: true,
    },
    Project {
        id: "project-3",
        title: "Open Source UI Component Library",
        tags: &["Svelte", "TypeScript", "Storybook", "Accessibility"],
        github: Some("https://github.com/example/ui-library"),
        featured: true,
    },
    Project {
        id: "project-4",
        title: "Machine Learning Model Deployment Tool",
        tags: &["Python", "Docker", "Kubernetes", "FastAPI"],
        github: Some("https://github.com/example/ml-deploy"),
        featured: true,
    },
];

pub const SOCIALS: &[SocialLink] = &[
    SocialLink {
        platform: "GitHub",
        url: "https://github.com/Hexdigest123",
    },
    SocialLink {
        platform: "Gitea",
        url: "https://git.merckel.dev",
    },
    SocialLink {
        platform: "Email",
        url: "mailto:pierre@merckel.dev",
    },
];

pub const WEB_TOOLS: &[WebTool] = &[
    WebTool {
        id: "url-shortener",
        name: "URL Shortener",
        slug: "url-shortener",
        description: "Turn long URLs into short, shareable links.",
        category: "utility",
        path: "/tools/url-shortener",
    },
    WebTool {
        id: "cron-generator",
        name: "Cron Expression Generator",
        slug: "cron-generator",
        description: "Build cron schedules visually with readable output.",
        category: "developer",
        path: "/tools/cron-generator",
    },
    WebTool {
        id: "text-diff",
        name: "Text Diff Checker",
        slug: "text-diff",
        description: "Compare two texts side by side with highlighted differences.",
        category: "developer",
        path: "/tools/text-diff",
    },
    WebTool {
        id: "image-converter",
        name: "Image Format Converter",
        slug: "image-converter",
        description: "Convert images between PNG, JPG and WebP in the browser.",
        category: "utility",
        path: "/tools/image-converter",
    },
    WebTool {
        id: "qr-generator",
        name: "QR Code Generator",
        slug: "qr-generator",
        description: "Generate scalable SVG or PNG QR codes for any URL.",
        category: "utility",
        path: "/tools/qr-generator",
    },
];

pub const SECTIONS: &[Section] = &[
    Section { id: "about", title: "About" },
    Section { id: "tools", title: "Tools" },
    Section { id: "projects", title: "Projects" },
    Section { id: "experience", title: "Experience" },
    Section { id: "open-source", title: "Open Source" },
    Section { id: "testimonials", title: "Testimonials" },
    Section { id: "contact", title: "Contact" },
];

pub fn find_tool(tool_id: &str) -> Option<&'static WebTool> {
    WEB_TOOLS.iter().find(|tool| tool.id == tool_id)
}

pub fn github_profile_url() -> Option<&'static str> {
    SOCIALS
        .iter()
        .find(|social| social.platform == "GitHub")
        .map(|social| social.url)
}

pub fn featured_project_count() -> usize {
    PROJECTS.iter().filter(|project| project.featured).count()
}
