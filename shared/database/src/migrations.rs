use rust_decimal::Decimal;
use sqlx::{migrate::Migrate, PgPool};
use uuid::Uuid;

use skillify_auth::PasswordService;
use skillify_common::{AppError, UserRole};

/// Password given to every seeded account.
pub const SEED_PASSWORD: &str = "password123";

pub struct SeedMentor {
    pub name: &'static str,
    pub email: &'static str,
    pub bio: &'static str,
    pub experience: i32,
    pub price_per_hour: i64,
    pub skills: &'static [&'static str],
}

pub const SEED_MENTORS: &[SeedMentor] = &[
    SeedMentor {
        name: "Sarah Jenkins",
        email: "sarah.j@example.com",
        bio: "Senior Frontend Engineer with 8 years of experience in React and Accessible UI design.",
        experience: 8,
        price_per_hour: 120,
        skills: &["React", "TypeScript", "Accessibility", "Design Systems"],
    },
    SeedMentor {
        name: "David Chen",
        email: "david.c@example.com",
        bio: "Full Stack Developer specializing in Node.js and Cloud Architecture (AWS).",
        experience: 6,
        price_per_hour: 150,
        skills: &["Node.js", "AWS", "Docker", "Microservices"],
    },
    SeedMentor {
        name: "Elena Rodriguez",
        email: "elena.r@example.com",
        bio: "Product Manager turned Data Scientist. I help engineers transition into ML.",
        experience: 5,
        price_per_hour: 200,
        skills: &["Python", "Machine Learning", "Data Analysis", "SQL"],
    },
    SeedMentor {
        name: "Michael Chang",
        email: "michael.c@example.com",
        bio: "Ex-Google Tech Lead. Expert in System Design and Interview Prep.",
        experience: 12,
        price_per_hour: 300,
        skills: &["System Design", "Java", "Go", "Distributed Systems"],
    },
    SeedMentor {
        name: "Priya Patel",
        email: "priya.p@example.com",
        bio: "Mobile Development Expert (iOS & Flutter). Published 10+ apps.",
        experience: 7,
        price_per_hour: 110,
        skills: &["Swift", "Flutter", "iOS", "Mobile Architecture"],
    },
    SeedMentor {
        name: "James Wilson",
        email: "james.w@example.com",
        bio: "Cybersecurity Analyst and Ethical Hacker. Learn to secure your apps.",
        experience: 9,
        price_per_hour: 180,
        skills: &["Cybersecurity", "Penetration Testing", "Network Security"],
    },
    SeedMentor {
        name: "Anita Singh",
        email: "anita.s@example.com",
        bio: "DevOps Engineer with a passion for automation and CI/CD pipelines.",
        experience: 6,
        price_per_hour: 130,
        skills: &["Kubernetes", "Terraform", "CI/CD", "Linux"],
    },
    SeedMentor {
        name: "Tom Baker",
        email: "tom.b@example.com",
        bio: "Blockchain Developer. Helping you understand Web3 and Smart Contracts.",
        experience: 4,
        price_per_hour: 160,
        skills: &["Solidity", "Ethereum", "Web3.js", "Smart Contracts"],
    },
];

pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_all_migrations(&self) -> Result<(), AppError> {
        tracing::info!("Starting database migrations...");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.into()))?;

        tracing::info!("All migrations completed successfully");
        Ok(())
    }

    pub async fn check_migration_status(&self) -> Result<MigrationStatus, AppError> {
        let migrator = sqlx::migrate!("./migrations");
        let mut conn = self.pool.acquire().await?;
        conn.ensure_migrations_table()
            .await
            .map_err(|e| AppError::Database(e.into()))?;
        let applied = conn
            .list_applied_migrations()
            .await
            .map_err(|e| AppError::Database(e.into()))?;

        let total = migrator.migrations.len();
        let applied_count = applied.len();
        let pending = total.saturating_sub(applied_count);

        Ok(MigrationStatus {
            total,
            applied: applied_count,
            pending,
            is_up_to_date: pending == 0,
        })
    }

    /// Upserts the demo mentors. Ratings are left to the review aggregate.
    pub async fn seed_initial_data(&self) -> Result<usize, AppError> {
        let password_hash = PasswordService::hash_password(SEED_PASSWORD)?;
        let mut tx = self.pool.begin().await?;

        for mentor in SEED_MENTORS {
            let user_id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO users (id, name, email, password_hash, role)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(mentor.name)
            .bind(mentor.email)
            .bind(&password_hash)
            .bind(UserRole::Mentor)
            .fetch_one(&mut *tx)
            .await?;

            let skills: Vec<String> = mentor.skills.iter().map(|s| s.to_string()).collect();
            sqlx::query(
                r#"
                INSERT INTO mentor_profiles (id, user_id, bio, price_per_hour, experience, skills)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (user_id) DO UPDATE SET
                    bio = EXCLUDED.bio,
                    price_per_hour = EXCLUDED.price_per_hour,
                    experience = EXCLUDED.experience,
                    skills = EXCLUDED.skills,
                    updated_at = NOW()
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(mentor.bio)
            .bind(Decimal::from(mentor.price_per_hour))
            .bind(mentor.experience)
            .bind(&skills)
            .execute(&mut *tx)
            .await?;

            tracing::info!("Seeded mentor: {}", mentor.name);
        }

        tx.commit().await?;
        Ok(SEED_MENTORS.len())
    }
}

#[derive(Debug)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
    pub pending: usize,
    pub is_up_to_date: bool,
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Migrations: {}/{} applied, {} pending",
            self.applied, self.total, self.pending
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seed_emails_are_unique() {
        let emails: HashSet<_> = SEED_MENTORS.iter().map(|m| m.email).collect();
        assert_eq!(emails.len(), SEED_MENTORS.len());
    }

    #[test]
    fn seed_values_satisfy_profile_constraints() {
        for mentor in SEED_MENTORS {
            assert!(mentor.experience >= 0);
            assert!(mentor.price_per_hour >= 0);
            assert!(!mentor.skills.is_empty());
        }
    }

    #[test]
    fn status_display_is_readable() {
        let status = MigrationStatus {
            total: 3,
            applied: 2,
            pending: 1,
            is_up_to_date: false,
        };
        assert_eq!(status.to_string(), "Migrations: 2/3 applied, 1 pending");
    }
}
