//! PostgreSQL storage backed by a sqlx connection pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};

use super::{Storage, StorageError, StorageResult};
use crate::db::models::{
    AdminUser, BlogCategory, BlogPost, BlogTag, CompanyContent, ContactSubmission,
    NewAdminUser, NewBlogCategory, NewBlogPost, NewBlogTag, NewContactSubmission,
    NewPortfolioProject, NewService, NewTeamMember, NewTestimonial, PortfolioProject,
    ProjectCategory, Service, Session, SessionIdentity, TeamMember, Testimonial,
    UpdateBlogCategory, UpdateBlogPost, UpdateBlogTag, UpdateCompanyContent,
    UpdatePortfolioProject, UpdateService, UpdateTeamMember, UpdateTestimonial,
    UpsertCompanyContent, UpsertUser, User,
};

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, profile_image_url, created_at, updated_at";
const ADMIN_USER_COLUMNS: &str =
    "id, username, password_hash, email, is_active, last_login, created_at";
const COMPANY_CONTENT_COLUMNS: &str =
    "id, section, title, description, content, metadata, created_at, updated_at";
const SERVICE_COLUMNS: &str =
    "id, title, description, icon, is_active, sort_order, created_at, updated_at";
const PORTFOLIO_COLUMNS: &str = "id, title, description, category, image_url, is_published, \
     metadata, sort_order, created_at, updated_at";
const TEAM_COLUMNS: &str =
    "id, name, position, bio, image_url, is_active, sort_order, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at";
const TAG_COLUMNS: &str = "id, name, slug, created_at";
const POST_COLUMNS: &str = "id, title, slug, excerpt, content, image_url, is_published, \
     meta_title, meta_description, meta_keywords, author_id, category_id, published_at, \
     created_at, updated_at";
const TESTIMONIAL_COLUMNS: &str = "id, customer_name, customer_title, customer_image_url, \
     content, rating, is_published, sort_order, created_at, updated_at";
const CONTACT_COLUMNS: &str =
    "id, first_name, last_name, email, phone, service_needed, message, is_read, created_at";

/// Map constraint violations onto storage errors; everything else stays a
/// database error.
fn classify(entity: &'static str) -> impl Fn(sqlx::Error) -> StorageError {
    move |err| {
        let (code, constraint) = match &err {
            sqlx::Error::Database(db) => (
                db.code().map(|c| c.into_owned()),
                db.constraint().map(str::to_owned),
            ),
            _ => (None, None),
        };
        match code.as_deref() {
            Some("23505") => StorageError::Conflict(entity),
            Some("23503") => StorageError::InvalidReference(referenced_entity(constraint.as_deref())),
            _ => StorageError::Database(err),
        }
    }
}

fn referenced_entity(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.contains("category_id") => "blog category",
        Some(c) if c.contains("author_id") => "user",
        Some(c) if c.contains("tag_id") => "blog tag",
        Some(c) if c.contains("post_id") => "blog post",
        _ => "record",
    }
}

fn affected(rows: u64, entity: &'static str) -> StorageResult<()> {
    if rows == 0 {
        Err(StorageError::NotFound(entity))
    } else {
        Ok(())
    }
}

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    async fn get_user(&self, id: &str) -> StorageResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn upsert_user(&self, user: &UpsertUser) -> StorageResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, first_name, last_name, profile_image_url)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                profile_image_url = EXCLUDED.profile_image_url,
                updated_at = now()
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.profile_image_url)
            .fetch_one(&self.pool)
            .await
            .map_err(classify("user"))
    }

    // ------------------------------------------------------------------------
    // Admin users
    // ------------------------------------------------------------------------

    async fn get_admin_user_by_username(&self, username: &str) -> StorageResult<Option<AdminUser>> {
        let sql = format!("SELECT {ADMIN_USER_COLUMNS} FROM admin_users WHERE username = $1");
        Ok(sqlx::query_as::<_, AdminUser>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_admin_user(&self, user: &NewAdminUser) -> StorageResult<AdminUser> {
        let sql = format!(
            "INSERT INTO admin_users (username, password_hash, email, is_active) \
             VALUES ($1, $2, $3, $4) RETURNING {ADMIN_USER_COLUMNS}"
        );
        sqlx::query_as::<_, AdminUser>(&sql)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.email)
            .bind(user.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(classify("admin user"))
    }

    async fn update_admin_user_last_login(&self, id: i32) -> StorageResult<()> {
        let result = sqlx::query("UPDATE admin_users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "admin user")
    }

    // ------------------------------------------------------------------------
    // Company content
    // ------------------------------------------------------------------------

    async fn list_company_content(&self) -> StorageResult<Vec<CompanyContent>> {
        let sql = format!("SELECT {COMPANY_CONTENT_COLUMNS} FROM company_content ORDER BY section");
        Ok(sqlx::query_as::<_, CompanyContent>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_company_content_by_section(
        &self,
        section: &str,
    ) -> StorageResult<Option<CompanyContent>> {
        let sql =
            format!("SELECT {COMPANY_CONTENT_COLUMNS} FROM company_content WHERE section = $1");
        Ok(sqlx::query_as::<_, CompanyContent>(&sql)
            .bind(section)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn upsert_company_content(
        &self,
        input: &UpsertCompanyContent,
    ) -> StorageResult<CompanyContent> {
        let sql = format!(
            r#"
            INSERT INTO company_content (section, title, description, content, metadata)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (section) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                content = EXCLUDED.content,
                metadata = EXCLUDED.metadata,
                updated_at = now()
            RETURNING {COMPANY_CONTENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, CompanyContent>(&sql)
            .bind(&input.section)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.content)
            .bind(&input.metadata)
            .fetch_one(&self.pool)
            .await
            .map_err(classify("company content"))
    }

    async fn update_company_content(
        &self,
        id: i32,
        input: &UpdateCompanyContent,
    ) -> StorageResult<CompanyContent> {
        let sql = format!(
            r#"
            UPDATE company_content SET
                section = COALESCE($2, section),
                title = CASE WHEN $7 THEN $3 ELSE title END,
                description = CASE WHEN $8 THEN $4 ELSE description END,
                content = CASE WHEN $9 THEN $5 ELSE content END,
                metadata = CASE WHEN $10 THEN $6 ELSE metadata END,
                updated_at = now()
            WHERE id = $1
            RETURNING {COMPANY_CONTENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, CompanyContent>(&sql)
            .bind(id)
            .bind(&input.section)
            .bind(input.title.clone().flatten())
            .bind(input.description.clone().flatten())
            .bind(input.content.clone().flatten())
            .bind(input.metadata.clone().flatten())
            .bind(input.title.is_some())
            .bind(input.description.is_some())
            .bind(input.content.is_some())
            .bind(input.metadata.is_some())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify("company content"))?
            .ok_or(StorageError::NotFound("company content"))
    }

    // ------------------------------------------------------------------------
    // Services
    // ------------------------------------------------------------------------

    async fn list_services(&self) -> StorageResult<Vec<Service>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY sort_order, id");
        Ok(sqlx::query_as::<_, Service>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_active_services(&self) -> StorageResult<Vec<Service>> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE is_active ORDER BY sort_order, id"
        );
        Ok(sqlx::query_as::<_, Service>(&sql).fetch_all(&self.pool).await?)
    }

    async fn create_service(&self, input: &NewService) -> StorageResult<Service> {
        let sql = format!(
            "INSERT INTO services (title, description, icon, is_active, sort_order) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SERVICE_COLUMNS}"
        );
        sqlx::query_as::<_, Service>(&sql)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.icon)
            .bind(input.is_active)
            .bind(input.sort_order)
            .fetch_one(&self.pool)
            .await
            .map_err(classify("service"))
    }

    async fn update_service(&self, id: i32, input: &UpdateService) -> StorageResult<Service> {
        let sql = format!(
            r#"
            UPDATE services SET
                title = COALESCE($2, title),
                description = CASE WHEN $7 THEN $3 ELSE description END,
                icon = CASE WHEN $8 THEN $4 ELSE icon END,
                is_active = COALESCE($5, is_active),
                sort_order = COALESCE($6, sort_order),
                updated_at = now()
            WHERE id = $1
            RETURNING {SERVICE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Service>(&sql)
            .bind(id)
            .bind(&input.title)
            .bind(input.description.clone().flatten())
            .bind(input.icon.clone().flatten())
            .bind(input.is_active)
            .bind(input.sort_order)
            .bind(input.description.is_some())
            .bind(input.icon.is_some())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify("service"))?
            .ok_or(StorageError::NotFound("service"))
    }

    async fn delete_service(&self, id: i32) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "service")
    }

    // ------------------------------------------------------------------------
    // Portfolio
    // ------------------------------------------------------------------------

    async fn list_portfolio_projects(&self) -> StorageResult<Vec<PortfolioProject>> {
        let sql =
            format!("SELECT {PORTFOLIO_COLUMNS} FROM portfolio_projects ORDER BY sort_order, id");
        Ok(sqlx::query_as::<_, PortfolioProject>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_published_portfolio_projects(&self) -> StorageResult<Vec<PortfolioProject>> {
        let sql = format!(
            "SELECT {PORTFOLIO_COLUMNS} FROM portfolio_projects \
             WHERE is_published ORDER BY sort_order, id"
        );
        Ok(sqlx::query_as::<_, PortfolioProject>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_portfolio_projects_by_category(
        &self,
        category: ProjectCategory,
    ) -> StorageResult<Vec<PortfolioProject>> {
        let sql = format!(
            "SELECT {PORTFOLIO_COLUMNS} FROM portfolio_projects \
             WHERE is_published AND category = $1 ORDER BY sort_order, id"
        );
        Ok(sqlx::query_as::<_, PortfolioProject>(&sql)
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_portfolio_project(
        &self,
        input: &NewPortfolioProject,
    ) -> StorageResult<PortfolioProject> {
        let sql = format!(
            r#"
            INSERT INTO portfolio_projects
                (title, description, category, image_url, is_published, metadata, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PORTFOLIO_COLUMNS}
            "#
        );
        sqlx::query_as::<_, PortfolioProject>(&sql)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.category.as_str())
            .bind(&input.image_url)
            .bind(input.is_published)
            .bind(&input.metadata)
            .bind(input.sort_order)
            .fetch_one(&self.pool)
            .await
            .map_err(classify("portfolio project"))
    }

    async fn update_portfolio_project(
        &self,
        id: i32,
        input: &UpdatePortfolioProject,
    ) -> StorageResult<PortfolioProject> {
        let sql = format!(
            r#"
            UPDATE portfolio_projects SET
                title = COALESCE($2, title),
                description = CASE WHEN $9 THEN $3 ELSE description END,
                category = COALESCE($4, category),
                image_url = CASE WHEN $10 THEN $5 ELSE image_url END,
                is_published = COALESCE($6, is_published),
                metadata = CASE WHEN $11 THEN $7 ELSE metadata END,
                sort_order = COALESCE($8, sort_order),
                updated_at = now()
            WHERE id = $1
            RETURNING {PORTFOLIO_COLUMNS}
            "#
        );
        sqlx::query_as::<_, PortfolioProject>(&sql)
            .bind(id)
            .bind(&input.title)
            .bind(input.description.clone().flatten())
            .bind(input.category.map(|c| c.as_str()))
            .bind(input.image_url.clone().flatten())
            .bind(input.is_published)
            .bind(input.metadata.clone().flatten())
            .bind(input.sort_order)
            .bind(input.description.is_some())
            .bind(input.image_url.is_some())
            .bind(input.metadata.is_some())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify("portfolio project"))?
            .ok_or(StorageError::NotFound("portfolio project"))
    }

    async fn delete_portfolio_project(&self, id: i32) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM portfolio_projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "portfolio project")
    }

    // ------------------------------------------------------------------------
    // Team
    // ------------------------------------------------------------------------

    async fn list_team_members(&self) -> StorageResult<Vec<TeamMember>> {
        let sql = format!("SELECT {TEAM_COLUMNS} FROM team_members ORDER BY sort_order, id");
        Ok(sqlx::query_as::<_, TeamMember>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_active_team_members(&self) -> StorageResult<Vec<TeamMember>> {
        let sql = format!(
            "SELECT {TEAM_COLUMNS} FROM team_members WHERE is_active ORDER BY sort_order, id"
        );
        Ok(sqlx::query_as::<_, TeamMember>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_team_member(&self, input: &NewTeamMember) -> StorageResult<TeamMember> {
        let sql = format!(
            "INSERT INTO team_members (name, position, bio, image_url, is_active, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {TEAM_COLUMNS}"
        );
        sqlx::query_as::<_, TeamMember>(&sql)
            .bind(&input.name)
            .bind(&input.position)
            .bind(&input.bio)
            .bind(&input.image_url)
            .bind(input.is_active)
            .bind(input.sort_order)
            .fetch_one(&self.pool)
            .await
            .map_err(classify("team member"))
    }

    async fn update_team_member(
        &self,
        id: i32,
        input: &UpdateTeamMember,
    ) -> StorageResult<TeamMember> {
        let sql = format!(
            r#"
            UPDATE team_members SET
                name = COALESCE($2, name),
                position = COALESCE($3, position),
                bio = CASE WHEN $8 THEN $4 ELSE bio END,
                image_url = CASE WHEN $9 THEN $5 ELSE image_url END,
                is_active = COALESCE($6, is_active),
                sort_order = COALESCE($7, sort_order),
                updated_at = now()
            WHERE id = $1
            RETURNING {TEAM_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TeamMember>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.position)
            .bind(input.bio.clone().flatten())
            .bind(input.image_url.clone().flatten())
            .bind(input.is_active)
            .bind(input.sort_order)
            .bind(input.bio.is_some())
            .bind(input.image_url.is_some())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify("team member"))?
            .ok_or(StorageError::NotFound("team member"))
    }

    async fn delete_team_member(&self, id: i32) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "team member")
    }

    // ------------------------------------------------------------------------
    // Blog categories and tags
    // ------------------------------------------------------------------------

    async fn list_blog_categories(&self) -> StorageResult<Vec<BlogCategory>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM blog_categories ORDER BY name");
        Ok(sqlx::query_as::<_, BlogCategory>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_blog_category(&self, input: &NewBlogCategory) -> StorageResult<BlogCategory> {
        let sql = format!(
            "INSERT INTO blog_categories (name, slug, description) \
             VALUES ($1, $2, $3) RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, BlogCategory>(&sql)
            .bind(&input.name)
            .bind(input.resolved_slug())
            .bind(&input.description)
            .fetch_one(&self.pool)
            .await
            .map_err(classify("blog category"))
    }

    async fn update_blog_category(
        &self,
        id: i32,
        input: &UpdateBlogCategory,
    ) -> StorageResult<BlogCategory> {
        let sql = format!(
            r#"
            UPDATE blog_categories SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = CASE WHEN $5 THEN $4 ELSE description END
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, BlogCategory>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(input.description.clone().flatten())
            .bind(input.description.is_some())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify("blog category"))?
            .ok_or(StorageError::NotFound("blog category"))
    }

    async fn delete_blog_category(&self, id: i32) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM blog_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "blog category")
    }

    async fn list_blog_tags(&self) -> StorageResult<Vec<BlogTag>> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM blog_tags ORDER BY name");
        Ok(sqlx::query_as::<_, BlogTag>(&sql).fetch_all(&self.pool).await?)
    }

    async fn create_blog_tag(&self, input: &NewBlogTag) -> StorageResult<BlogTag> {
        let sql = format!(
            "INSERT INTO blog_tags (name, slug) VALUES ($1, $2) RETURNING {TAG_COLUMNS}"
        );
        sqlx::query_as::<_, BlogTag>(&sql)
            .bind(&input.name)
            .bind(input.resolved_slug())
            .fetch_one(&self.pool)
            .await
            .map_err(classify("blog tag"))
    }

    async fn update_blog_tag(&self, id: i32, input: &UpdateBlogTag) -> StorageResult<BlogTag> {
        let sql = format!(
            "UPDATE blog_tags SET name = COALESCE($2, name), slug = COALESCE($3, slug) \
             WHERE id = $1 RETURNING {TAG_COLUMNS}"
        );
        sqlx::query_as::<_, BlogTag>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify("blog tag"))?
            .ok_or(StorageError::NotFound("blog tag"))
    }

    async fn delete_blog_tag(&self, id: i32) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM blog_post_tags WHERE tag_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM blog_tags WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        affected(result.rows_affected(), "blog tag")?;
        tx.commit().await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Blog posts
    // ------------------------------------------------------------------------

    async fn list_blog_posts(&self) -> StorageResult<Vec<BlogPost>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts ORDER BY created_at DESC, id DESC");
        Ok(sqlx::query_as::<_, BlogPost>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_published_blog_posts(&self) -> StorageResult<Vec<BlogPost>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE is_published \
             ORDER BY published_at DESC NULLS LAST, id DESC"
        );
        Ok(sqlx::query_as::<_, BlogPost>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_blog_post(&self, id: i32) -> StorageResult<Option<BlogPost>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE id = $1");
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_blog_post_by_slug(&self, slug: &str) -> StorageResult<Option<BlogPost>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = $1");
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_blog_post(&self, input: &NewBlogPost) -> StorageResult<BlogPost> {
        let sql = format!(
            r#"
            INSERT INTO blog_posts
                (title, slug, excerpt, content, image_url, is_published, meta_title,
                 meta_description, meta_keywords, author_id, category_id, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {POST_COLUMNS}
            "#
        );
        sqlx::query_as::<_, BlogPost>(&sql)
            .bind(&input.title)
            .bind(input.resolved_slug())
            .bind(&input.excerpt)
            .bind(&input.content)
            .bind(&input.image_url)
            .bind(input.is_published)
            .bind(&input.meta_title)
            .bind(&input.meta_description)
            .bind(&input.meta_keywords)
            .bind(&input.author_id)
            .bind(input.category_id)
            .bind(input.published_at)
            .fetch_one(&self.pool)
            .await
            .map_err(classify("blog post"))
    }

    async fn update_blog_post(&self, id: i32, input: &UpdateBlogPost) -> StorageResult<BlogPost> {
        let sql = format!(
            r#"
            UPDATE blog_posts SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                excerpt = CASE WHEN $14 THEN $4 ELSE excerpt END,
                content = CASE WHEN $15 THEN $5 ELSE content END,
                image_url = CASE WHEN $16 THEN $6 ELSE image_url END,
                is_published = COALESCE($7, is_published),
                meta_title = CASE WHEN $17 THEN $8 ELSE meta_title END,
                meta_description = CASE WHEN $18 THEN $9 ELSE meta_description END,
                meta_keywords = CASE WHEN $19 THEN $10 ELSE meta_keywords END,
                author_id = CASE WHEN $20 THEN $11 ELSE author_id END,
                category_id = CASE WHEN $21 THEN $12 ELSE category_id END,
                published_at = CASE WHEN $22 THEN $13 ELSE published_at END,
                updated_at = now()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        );
        sqlx::query_as::<_, BlogPost>(&sql)
            .bind(id)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(input.excerpt.clone().flatten())
            .bind(input.content.clone().flatten())
            .bind(input.image_url.clone().flatten())
            .bind(input.is_published)
            .bind(input.meta_title.clone().flatten())
            .bind(input.meta_description.clone().flatten())
            .bind(input.meta_keywords.clone().flatten())
            .bind(input.author_id.clone().flatten())
            .bind(input.category_id.flatten())
            .bind(input.published_at.flatten())
            .bind(input.excerpt.is_some())
            .bind(input.content.is_some())
            .bind(input.image_url.is_some())
            .bind(input.meta_title.is_some())
            .bind(input.meta_description.is_some())
            .bind(input.meta_keywords.is_some())
            .bind(input.author_id.is_some())
            .bind(input.category_id.is_some())
            .bind(input.published_at.is_some())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify("blog post"))?
            .ok_or(StorageError::NotFound("blog post"))
    }

    async fn delete_blog_post(&self, id: i32) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM blog_post_tags WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        affected(result.rows_affected(), "blog post")?;
        tx.commit().await?;
        Ok(())
    }

    async fn add_tag_to_post(&self, post_id: i32, tag_id: i32) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO blog_post_tags (post_id, tag_id) VALUES ($1, $2) \
             ON CONFLICT (post_id, tag_id) DO NOTHING",
        )
        .bind(post_id)
        .bind(tag_id)
        .execute(&self.pool)
        .await
        .map_err(classify("blog post tag"))?;
        Ok(())
    }

    async fn remove_tag_from_post(&self, post_id: i32, tag_id: i32) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM blog_post_tags WHERE post_id = $1 AND tag_id = $2")
            .bind(post_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "blog post tag")
    }

    async fn list_post_tags(&self, post_id: i32) -> StorageResult<Vec<BlogTag>> {
        Ok(sqlx::query_as::<_, BlogTag>(
            r#"
            SELECT t.id, t.name, t.slug, t.created_at
            FROM blog_tags t
            JOIN blog_post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ------------------------------------------------------------------------
    // Testimonials
    // ------------------------------------------------------------------------

    async fn list_testimonials(&self) -> StorageResult<Vec<Testimonial>> {
        let sql = format!("SELECT {TESTIMONIAL_COLUMNS} FROM testimonials ORDER BY sort_order, id");
        Ok(sqlx::query_as::<_, Testimonial>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_published_testimonials(&self) -> StorageResult<Vec<Testimonial>> {
        let sql = format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials \
             WHERE is_published ORDER BY sort_order, id"
        );
        Ok(sqlx::query_as::<_, Testimonial>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_testimonial(&self, input: &NewTestimonial) -> StorageResult<Testimonial> {
        let sql = format!(
            r#"
            INSERT INTO testimonials
                (customer_name, customer_title, customer_image_url, content, rating,
                 is_published, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TESTIMONIAL_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Testimonial>(&sql)
            .bind(&input.customer_name)
            .bind(&input.customer_title)
            .bind(&input.customer_image_url)
            .bind(&input.content)
            .bind(input.rating)
            .bind(input.is_published)
            .bind(input.sort_order)
            .fetch_one(&self.pool)
            .await
            .map_err(classify("testimonial"))
    }

    async fn update_testimonial(
        &self,
        id: i32,
        input: &UpdateTestimonial,
    ) -> StorageResult<Testimonial> {
        let sql = format!(
            r#"
            UPDATE testimonials SET
                customer_name = COALESCE($2, customer_name),
                customer_title = CASE WHEN $9 THEN $3 ELSE customer_title END,
                customer_image_url = CASE WHEN $10 THEN $4 ELSE customer_image_url END,
                content = COALESCE($5, content),
                rating = COALESCE($6, rating),
                is_published = COALESCE($7, is_published),
                sort_order = COALESCE($8, sort_order),
                updated_at = now()
            WHERE id = $1
            RETURNING {TESTIMONIAL_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Testimonial>(&sql)
            .bind(id)
            .bind(&input.customer_name)
            .bind(input.customer_title.clone().flatten())
            .bind(input.customer_image_url.clone().flatten())
            .bind(&input.content)
            .bind(input.rating)
            .bind(input.is_published)
            .bind(input.sort_order)
            .bind(input.customer_title.is_some())
            .bind(input.customer_image_url.is_some())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify("testimonial"))?
            .ok_or(StorageError::NotFound("testimonial"))
    }

    async fn delete_testimonial(&self, id: i32) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM testimonials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "testimonial")
    }

    // ------------------------------------------------------------------------
    // Contact submissions
    // ------------------------------------------------------------------------

    async fn create_contact_submission(
        &self,
        input: &NewContactSubmission,
    ) -> StorageResult<ContactSubmission> {
        let sql = format!(
            r#"
            INSERT INTO contact_submissions
                (first_name, last_name, email, phone, service_needed, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CONTACT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ContactSubmission>(&sql)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.service_needed)
            .bind(&input.message)
            .fetch_one(&self.pool)
            .await
            .map_err(classify("contact submission"))
    }

    async fn list_contact_submissions(&self) -> StorageResult<Vec<ContactSubmission>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contact_submissions ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, ContactSubmission>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn set_contact_submission_read(&self, id: i32, is_read: bool) -> StorageResult<()> {
        let result = sqlx::query("UPDATE contact_submissions SET is_read = $2 WHERE id = $1")
            .bind(id)
            .bind(is_read)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "contact submission")
    }

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------

    async fn create_session(&self, session: &Session) -> StorageResult<()> {
        sqlx::query("INSERT INTO sessions (sid, identity, expires_at) VALUES ($1, $2, $3)")
            .bind(&session.token_hash)
            .bind(Json(&session.identity))
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(classify("session"))?;
        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> StorageResult<Option<Session>> {
        let row = sqlx::query_as::<_, (String, Json<SessionIdentity>, DateTime<Utc>)>(
            "SELECT sid, identity, expires_at FROM sessions WHERE sid = $1 AND expires_at > now()",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(token_hash, identity, expires_at)| Session {
            token_hash,
            identity: identity.0,
            expires_at,
        }))
    }

    async fn delete_session(&self, token_hash: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM sessions WHERE sid = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired_sessions(&self) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referenced_entity_from_constraint_name() {
        assert_eq!(
            referenced_entity(Some("blog_posts_category_id_fkey")),
            "blog category"
        );
        assert_eq!(referenced_entity(Some("blog_post_tags_tag_id_fkey")), "blog tag");
        assert_eq!(referenced_entity(Some("blog_posts_author_id_fkey")), "user");
        assert_eq!(referenced_entity(None), "record");
    }

    #[test]
    fn test_affected_zero_rows_is_not_found() {
        assert!(matches!(
            affected(0, "service"),
            Err(StorageError::NotFound("service"))
        ));
        assert!(affected(1, "service").is_ok());
    }

    #[test]
    fn test_classify_passes_through_non_database_errors() {
        let err = classify("service")(sqlx::Error::RowNotFound);
        assert!(matches!(err, StorageError::Database(_)));
    }
}
