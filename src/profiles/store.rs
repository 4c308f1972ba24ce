use serde::Deserialize;
use sqlx::{types::Json, SqlitePool};

use crate::models::{non_blank, split_list, Actor, ActorKind};

/// Editable profile fields as one form; each actor kind reads its own subset.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    pub name: Option<String>,
    pub address: Option<String>,
    pub preferences: Option<String>,
    pub skills: Option<String>,
    pub personality: Option<String>,
    pub bio: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub profile_image_url: Option<String>,

    pub company_name: Option<String>,
    pub description: Option<String>,
    pub culture: Option<String>,
    pub benefits: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub logo_url: Option<String>,
}

impl ProfileForm {
    /// The display name this form gives an actor of `kind`, if any.
    pub fn name_for(&self, kind: ActorKind) -> Option<String> {
        match kind {
            ActorKind::JobSeeker => non_blank(self.name.clone()),
            ActorKind::Company => non_blank(self.company_name.clone()),
        }
    }
}

fn list(raw: &Option<String>) -> Json<Vec<String>> {
    Json(split_list(raw.as_deref().unwrap_or_default()))
}

/// Writes the form over the actor's row. Returns false when no row matched.
pub async fn update(db_pool: &SqlitePool, actor: &Actor, form: ProfileForm) -> Result<bool, sqlx::Error> {
    let done = match actor {
        Actor::JobSeeker(seeker) => {
            let name = form.name_for(ActorKind::JobSeeker).unwrap_or_else(|| seeker.name.clone());
            sqlx::query(
                r#"UPDATE job_seekers SET
                    name=?, address=?, preferences=?, skills=?, personality=?, bio=?,
                    experience=?, education=?, profile_image_url=?,
                    updated_at=strftime('%Y-%m-%dT%H:%M:%fZ','now')
                WHERE id=?"#,
            )
                .bind(name)
                .bind(non_blank(form.address))
                .bind(list(&form.preferences))
                .bind(list(&form.skills))
                .bind(non_blank(form.personality))
                .bind(non_blank(form.bio))
                .bind(non_blank(form.experience))
                .bind(non_blank(form.education))
                .bind(non_blank(form.profile_image_url))
                .bind(&seeker.id)
                .execute(db_pool)
                .await?
        }
        Actor::Company(company) => {
            let name = form.name_for(ActorKind::Company).unwrap_or_else(|| company.company_name.clone());
            sqlx::query(
                r#"UPDATE companies SET
                    company_name=?, description=?, culture=?, benefits=?, location=?,
                    website=?, company_size=?, industry=?, logo_url=?,
                    updated_at=strftime('%Y-%m-%dT%H:%M:%fZ','now')
                WHERE id=?"#,
            )
                .bind(name)
                .bind(non_blank(form.description))
                .bind(non_blank(form.culture))
                .bind(list(&form.benefits))
                .bind(non_blank(form.location))
                .bind(non_blank(form.website))
                .bind(non_blank(form.company_size))
                .bind(non_blank(form.industry))
                .bind(non_blank(form.logo_url))
                .bind(&company.id)
                .execute(db_pool)
                .await?
        }
    };

    Ok(done.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::provision_actor, db::test_pool};

    #[tokio::test]
    async fn seeker_update_keeps_name_when_blank() {
        let db_pool = test_pool().await;
        provision_actor(&db_pool, ActorKind::JobSeeker, "s1", Some("ada@example.com"), Some("Ada")).await.unwrap();
        let actor = Actor::find(&db_pool, "s1").await.unwrap().unwrap();

        let form = ProfileForm {
            name: Some("  ".to_owned()),
            skills: Some("rust, go ,".to_owned()),
            bio: Some("Systems person".to_owned()),
            ..Default::default()
        };
        assert!(update(&db_pool, &actor, form).await.unwrap());

        let Some(Actor::JobSeeker(seeker)) = Actor::find(&db_pool, "s1").await.unwrap() else {
            panic!("expected a job seeker");
        };
        assert_eq!(seeker.name, "Ada");
        assert_eq!(seeker.skills, vec!["rust", "go"]);
        assert_eq!(seeker.bio.as_deref(), Some("Systems person"));
        assert!(seeker.preferences.is_empty());
    }

    #[tokio::test]
    async fn company_update_reads_company_fields() {
        let db_pool = test_pool().await;
        provision_actor(&db_pool, ActorKind::Company, "c1", Some("hr@acme.io"), Some("Acme")).await.unwrap();
        let actor = Actor::find(&db_pool, "c1").await.unwrap().unwrap();

        let form = ProfileForm {
            name: Some("ignored".to_owned()),
            company_name: Some("Acme Corp".to_owned()),
            benefits: Some("remote,equity".to_owned()),
            ..Default::default()
        };
        assert!(update(&db_pool, &actor, form).await.unwrap());

        let Some(Actor::Company(company)) = Actor::find(&db_pool, "c1").await.unwrap() else {
            panic!("expected a company");
        };
        assert_eq!(company.company_name, "Acme Corp");
        assert_eq!(company.benefits, vec!["remote", "equity"]);
    }
}
