//! Mock dataset loaded into a fresh store.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    Community, KnowledgeItem, KnowledgeType, Query, QueryStatus, Role, User,
};

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn knowledge() -> Vec<KnowledgeItem> {
    vec![
        KnowledgeItem {
            id: "1".into(),
            title: "React Component Best Practices".into(),
            content: "Always use functional components with hooks. Keep components small and \
                      focused on a single responsibility. Use proper naming conventions and \
                      PropTypes for type checking."
                .into(),
            category: "Frontend Development".into(),
            tags: strings(&["React", "JavaScript", "Best Practices"]),
            author: "John Doe".into(),
            project: "Web Development".into(),
            kind: KnowledgeType::BestPractice,
            created_at: date(2024, 1, 15),
            likes: 15,
            attachments: Vec::new(),
        },
        KnowledgeItem {
            id: "2".into(),
            title: "Database Connection SOP".into(),
            content: "Step 1: Ensure VPN connection is active. Step 2: Use environment \
                      variables for credentials. Step 3: Implement connection pooling. \
                      Step 4: Always close connections after use."
                .into(),
            category: "Backend Development".into(),
            tags: strings(&["Database", "SOP", "Security"]),
            author: "Jane Smith".into(),
            project: "Backend Services".into(),
            kind: KnowledgeType::Sop,
            created_at: date(2024, 1, 10),
            likes: 23,
            attachments: Vec::new(),
        },
        KnowledgeItem {
            id: "3".into(),
            title: "Client Onboarding Process".into(),
            content: "Our team successfully onboarded Client X by creating a comprehensive \
                      documentation system and regular check-in meetings. Key learnings: \
                      Early stakeholder engagement is crucial."
                .into(),
            category: "Project Management".into(),
            tags: strings(&["Client Management", "Onboarding", "Experience"]),
            author: "Mike Johnson".into(),
            project: "Client X".into(),
            kind: KnowledgeType::Experience,
            created_at: date(2024, 1, 20),
            likes: 8,
            attachments: Vec::new(),
        },
    ]
}

pub fn queries() -> Vec<Query> {
    vec![
        Query {
            id: "1".into(),
            question: "How do I handle authentication in React?".into(),
            answer: Some(
                "You can use Context API with useState for simple auth state management, \
                 or libraries like Auth0 for more complex scenarios."
                    .into(),
            ),
            author: "Sarah Wilson".into(),
            answered_by: Some("Alex Brown".into()),
            project: "Web Development".into(),
            created_at: date(2024, 1, 18),
            status: QueryStatus::Answered,
            ai_answer: None,
        },
        Query {
            id: "2".into(),
            question: "What is the best way to optimize database queries?".into(),
            answer: None,
            author: "Tom Davis".into(),
            answered_by: None,
            project: "Backend Services".into(),
            created_at: date(2024, 1, 22),
            status: QueryStatus::Pending,
            ai_answer: None,
        },
    ]
}

pub fn communities() -> Vec<Community> {
    vec![
        Community {
            id: "1".into(),
            name: "Web Development Team".into(),
            project: "Web Development".into(),
            members: strings(&["John Doe", "Sarah Wilson", "Alex Brown"]),
            description: "Frontend and full-stack development discussions".into(),
            created_at: date(2024, 1, 1),
            is_active: true,
        },
        Community {
            id: "2".into(),
            name: "Backend Services".into(),
            project: "Backend Services".into(),
            members: strings(&["Jane Smith", "Tom Davis"]),
            description: "Backend architecture and database discussions".into(),
            created_at: date(2024, 1, 2),
            is_active: true,
        },
        Community {
            id: "3".into(),
            name: "Client X Project".into(),
            project: "Client X".into(),
            members: strings(&["Mike Johnson", "Lisa Chen"]),
            description: "Client-specific project collaboration".into(),
            created_at: date(2024, 1, 3),
            is_active: true,
        },
    ]
}

/// The built-in administrator account.
pub fn users(admin_password: &str) -> Vec<User> {
    vec![User {
        id: "1".into(),
        username: "admin".into(),
        email: "admin@skillsync.com".into(),
        password: admin_password.to_string(),
        role: Role::Admin,
        created_at: date(2024, 1, 1),
        is_active: true,
    }]
}
