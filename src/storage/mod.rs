//! Storage access layer.
//!
//! One trait with a get/list/create/update/delete surface per entity.
//! `PgStorage` is the production implementation; `MemoryStorage` backs the
//! test suite and database-less development runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::db::models::{
    AdminUser, BlogCategory, BlogPost, BlogTag, CompanyContent, ContactSubmission,
    NewAdminUser, NewBlogCategory, NewBlogPost, NewBlogTag, NewContactSubmission,
    NewPortfolioProject, NewService, NewTeamMember, NewTestimonial, PortfolioProject,
    ProjectCategory, Service, Session, TeamMember, Testimonial, UpdateBlogCategory,
    UpdateBlogPost, UpdateBlogTag, UpdateCompanyContent, UpdatePortfolioProject, UpdateService,
    UpdateTeamMember, UpdateTestimonial, UpsertCompanyContent, UpsertUser, User,
};

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unique constraint violation.
    #[error("{0} already exists")]
    Conflict(&'static str),

    /// Foreign key points at a row that does not exist.
    #[error("invalid reference to {0}")]
    InvalidReference(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Cheap round trip used by the readiness check.
    async fn ping(&self) -> StorageResult<()>;

    // Hosted-identity users
    async fn get_user(&self, id: &str) -> StorageResult<Option<User>>;
    async fn upsert_user(&self, user: &UpsertUser) -> StorageResult<User>;

    // Local admin accounts
    async fn get_admin_user_by_username(&self, username: &str) -> StorageResult<Option<AdminUser>>;
    async fn create_admin_user(&self, user: &NewAdminUser) -> StorageResult<AdminUser>;
    async fn update_admin_user_last_login(&self, id: i32) -> StorageResult<()>;

    // Company content
    async fn list_company_content(&self) -> StorageResult<Vec<CompanyContent>>;
    async fn get_company_content_by_section(
        &self,
        section: &str,
    ) -> StorageResult<Option<CompanyContent>>;
    async fn upsert_company_content(
        &self,
        input: &UpsertCompanyContent,
    ) -> StorageResult<CompanyContent>;
    async fn update_company_content(
        &self,
        id: i32,
        input: &UpdateCompanyContent,
    ) -> StorageResult<CompanyContent>;

    // Services
    async fn list_services(&self) -> StorageResult<Vec<Service>>;
    async fn list_active_services(&self) -> StorageResult<Vec<Service>>;
    async fn create_service(&self, input: &NewService) -> StorageResult<Service>;
    async fn update_service(&self, id: i32, input: &UpdateService) -> StorageResult<Service>;
    async fn delete_service(&self, id: i32) -> StorageResult<()>;

    // Portfolio
    async fn list_portfolio_projects(&self) -> StorageResult<Vec<PortfolioProject>>;
    async fn list_published_portfolio_projects(&self) -> StorageResult<Vec<PortfolioProject>>;
    async fn list_portfolio_projects_by_category(
        &self,
        category: ProjectCategory,
    ) -> StorageResult<Vec<PortfolioProject>>;
    async fn create_portfolio_project(
        &self,
        input: &NewPortfolioProject,
    ) -> StorageResult<PortfolioProject>;
    async fn update_portfolio_project(
        &self,
        id: i32,
        input: &UpdatePortfolioProject,
    ) -> StorageResult<PortfolioProject>;
    async fn delete_portfolio_project(&self, id: i32) -> StorageResult<()>;

    // Team
    async fn list_team_members(&self) -> StorageResult<Vec<TeamMember>>;
    async fn list_active_team_members(&self) -> StorageResult<Vec<TeamMember>>;
    async fn create_team_member(&self, input: &NewTeamMember) -> StorageResult<TeamMember>;
    async fn update_team_member(
        &self,
        id: i32,
        input: &UpdateTeamMember,
    ) -> StorageResult<TeamMember>;
    async fn delete_team_member(&self, id: i32) -> StorageResult<()>;

    // Blog categories and tags
    async fn list_blog_categories(&self) -> StorageResult<Vec<BlogCategory>>;
    async fn create_blog_category(&self, input: &NewBlogCategory) -> StorageResult<BlogCategory>;
    async fn update_blog_category(
        &self,
        id: i32,
        input: &UpdateBlogCategory,
    ) -> StorageResult<BlogCategory>;
    /// Posts in the category keep existing with `category_id` cleared.
    async fn delete_blog_category(&self, id: i32) -> StorageResult<()>;
    async fn list_blog_tags(&self) -> StorageResult<Vec<BlogTag>>;
    async fn create_blog_tag(&self, input: &NewBlogTag) -> StorageResult<BlogTag>;
    async fn update_blog_tag(&self, id: i32, input: &UpdateBlogTag) -> StorageResult<BlogTag>;
    /// Removes the tag and every post link to it.
    async fn delete_blog_tag(&self, id: i32) -> StorageResult<()>;

    // Blog posts
    async fn list_blog_posts(&self) -> StorageResult<Vec<BlogPost>>;
    async fn list_published_blog_posts(&self) -> StorageResult<Vec<BlogPost>>;
    async fn get_blog_post(&self, id: i32) -> StorageResult<Option<BlogPost>>;
    async fn get_blog_post_by_slug(&self, slug: &str) -> StorageResult<Option<BlogPost>>;
    async fn create_blog_post(&self, input: &NewBlogPost) -> StorageResult<BlogPost>;
    async fn update_blog_post(&self, id: i32, input: &UpdateBlogPost) -> StorageResult<BlogPost>;
    /// Deletes the post's tag links and then the post, atomically.
    async fn delete_blog_post(&self, id: i32) -> StorageResult<()>;
    /// Linking an already-linked tag is a no-op.
    async fn add_tag_to_post(&self, post_id: i32, tag_id: i32) -> StorageResult<()>;
    async fn remove_tag_from_post(&self, post_id: i32, tag_id: i32) -> StorageResult<()>;
    async fn list_post_tags(&self, post_id: i32) -> StorageResult<Vec<BlogTag>>;

    // Testimonials
    async fn list_testimonials(&self) -> StorageResult<Vec<Testimonial>>;
    async fn list_published_testimonials(&self) -> StorageResult<Vec<Testimonial>>;
    async fn create_testimonial(&self, input: &NewTestimonial) -> StorageResult<Testimonial>;
    async fn update_testimonial(
        &self,
        id: i32,
        input: &UpdateTestimonial,
    ) -> StorageResult<Testimonial>;
    async fn delete_testimonial(&self, id: i32) -> StorageResult<()>;

    // Contact submissions
    async fn create_contact_submission(
        &self,
        input: &NewContactSubmission,
    ) -> StorageResult<ContactSubmission>;
    async fn list_contact_submissions(&self) -> StorageResult<Vec<ContactSubmission>>;
    async fn set_contact_submission_read(&self, id: i32, is_read: bool) -> StorageResult<()>;

    // Sessions
    async fn create_session(&self, session: &Session) -> StorageResult<()>;
    /// Expired sessions are treated as absent.
    async fn get_session(&self, token_hash: &str) -> StorageResult<Option<Session>>;
    async fn delete_session(&self, token_hash: &str) -> StorageResult<()>;
    async fn delete_expired_sessions(&self) -> StorageResult<u64>;
}
