//! In-process storage with the same semantics as `PgStorage`: unique keys,
//! reference checks, cascades and ordering all behave like the SQL schema.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Storage, StorageError, StorageResult};
use crate::db::models::{
    AdminUser, BlogCategory, BlogPost, BlogPostTag, BlogTag, CompanyContent, ContactSubmission,
    NewAdminUser, NewBlogCategory, NewBlogPost, NewBlogTag, NewContactSubmission,
    NewPortfolioProject, NewService, NewTeamMember, NewTestimonial, PortfolioProject,
    ProjectCategory, Service, Session, TeamMember, Testimonial, UpdateBlogCategory,
    UpdateBlogPost, UpdateBlogTag, UpdateCompanyContent, UpdatePortfolioProject, UpdateService,
    UpdateTeamMember, UpdateTestimonial, UpsertCompanyContent, UpsertUser, User,
};

#[derive(Default)]
struct Tables {
    next_id: i32,
    users: Vec<User>,
    admin_users: Vec<AdminUser>,
    company_content: Vec<CompanyContent>,
    services: Vec<Service>,
    portfolio: Vec<PortfolioProject>,
    team: Vec<TeamMember>,
    categories: Vec<BlogCategory>,
    tags: Vec<BlogTag>,
    posts: Vec<BlogPost>,
    post_tags: Vec<BlogPostTag>,
    testimonials: Vec<Testimonial>,
    contacts: Vec<ContactSubmission>,
    sessions: Vec<Session>,
}

impl Tables {
    /// One sequence shared by every table; ids only need to be unique per table.
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn check_post_refs(
        &self,
        author_id: Option<&String>,
        category_id: Option<i32>,
    ) -> StorageResult<()> {
        if let Some(author) = author_id {
            if !self.users.iter().any(|u| &u.id == author) {
                return Err(StorageError::InvalidReference("user"));
            }
        }
        if let Some(category) = category_id {
            if !self.categories.iter().any(|c| c.id == category) {
                return Err(StorageError::InvalidReference("blog category"));
            }
        }
        Ok(())
    }
}

fn find_mut<'a, T>(
    rows: &'a mut [T],
    entity: &'static str,
    pred: impl Fn(&T) -> bool,
) -> StorageResult<&'a mut T> {
    rows.iter_mut()
        .find(|row| pred(row))
        .ok_or(StorageError::NotFound(entity))
}

fn remove_where<T>(
    rows: &mut Vec<T>,
    entity: &'static str,
    pred: impl Fn(&T) -> bool,
) -> StorageResult<()> {
    let before = rows.len();
    rows.retain(|row| !pred(row));
    if rows.len() == before {
        Err(StorageError::NotFound(entity))
    } else {
        Ok(())
    }
}

fn by_sort_order<T>(mut rows: Vec<T>, key: impl Fn(&T) -> (i32, i32)) -> Vec<T> {
    rows.sort_by_key(|row| key(row));
    rows
}

/// `None` keeps the stored value. For nullable columns `T` is itself an
/// `Option`, so `Some(None)` clears the column.
fn apply<T>(target: &mut T, value: &Option<T>)
where
    T: Clone,
{
    if let Some(value) = value {
        *target = value.clone();
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn get_user(&self, id: &str) -> StorageResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn upsert_user(&self, user: &UpsertUser) -> StorageResult<User> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        if let Some(existing) = tables.users.iter_mut().find(|u| u.id == user.id) {
            existing.email = user.email.clone();
            existing.first_name = user.first_name.clone();
            existing.last_name = user.last_name.clone();
            existing.profile_image_url = user.profile_image_url.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let row = User {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_image_url: user.profile_image_url.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn get_admin_user_by_username(&self, username: &str) -> StorageResult<Option<AdminUser>> {
        let tables = self.tables.read().await;
        Ok(tables
            .admin_users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_admin_user(&self, user: &NewAdminUser) -> StorageResult<AdminUser> {
        let mut tables = self.tables.write().await;
        if tables.admin_users.iter().any(|u| u.username == user.username) {
            return Err(StorageError::Conflict("admin user"));
        }
        let row = AdminUser {
            id: tables.next_id(),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            email: user.email.clone(),
            is_active: user.is_active,
            last_login: None,
            created_at: Utc::now(),
        };
        tables.admin_users.push(row.clone());
        Ok(row)
    }

    async fn update_admin_user_last_login(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let user = find_mut(&mut tables.admin_users, "admin user", |u| u.id == id)?;
        user.last_login = Some(Utc::now());
        Ok(())
    }

    async fn list_company_content(&self) -> StorageResult<Vec<CompanyContent>> {
        let tables = self.tables.read().await;
        let mut rows = tables.company_content.clone();
        rows.sort_by(|a, b| a.section.cmp(&b.section));
        Ok(rows)
    }

    async fn get_company_content_by_section(
        &self,
        section: &str,
    ) -> StorageResult<Option<CompanyContent>> {
        let tables = self.tables.read().await;
        Ok(tables
            .company_content
            .iter()
            .find(|c| c.section == section)
            .cloned())
    }

    async fn upsert_company_content(
        &self,
        input: &UpsertCompanyContent,
    ) -> StorageResult<CompanyContent> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        if let Some(existing) = tables
            .company_content
            .iter_mut()
            .find(|c| c.section == input.section)
        {
            existing.title = input.title.clone();
            existing.description = input.description.clone();
            existing.content = input.content.clone();
            existing.metadata = input.metadata.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let row = CompanyContent {
            id: tables.next_id(),
            section: input.section.clone(),
            title: input.title.clone(),
            description: input.description.clone(),
            content: input.content.clone(),
            metadata: input.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.company_content.push(row.clone());
        Ok(row)
    }

    async fn update_company_content(
        &self,
        id: i32,
        input: &UpdateCompanyContent,
    ) -> StorageResult<CompanyContent> {
        let mut tables = self.tables.write().await;
        if let Some(section) = &input.section {
            if tables
                .company_content
                .iter()
                .any(|c| c.id != id && &c.section == section)
            {
                return Err(StorageError::Conflict("company content"));
            }
        }
        let row = find_mut(&mut tables.company_content, "company content", |c| c.id == id)?;
        apply(&mut row.section, &input.section);
        apply(&mut row.title, &input.title);
        apply(&mut row.description, &input.description);
        apply(&mut row.content, &input.content);
        apply(&mut row.metadata, &input.metadata);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn list_services(&self) -> StorageResult<Vec<Service>> {
        let tables = self.tables.read().await;
        Ok(by_sort_order(tables.services.clone(), |s| (s.sort_order, s.id)))
    }

    async fn list_active_services(&self) -> StorageResult<Vec<Service>> {
        let tables = self.tables.read().await;
        let rows = tables.services.iter().filter(|s| s.is_active).cloned().collect();
        Ok(by_sort_order(rows, |s| (s.sort_order, s.id)))
    }

    async fn create_service(&self, input: &NewService) -> StorageResult<Service> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let row = Service {
            id: tables.next_id(),
            title: input.title.clone(),
            description: input.description.clone(),
            icon: input.icon.clone(),
            is_active: input.is_active,
            sort_order: input.sort_order,
            created_at: now,
            updated_at: now,
        };
        tables.services.push(row.clone());
        Ok(row)
    }

    async fn update_service(&self, id: i32, input: &UpdateService) -> StorageResult<Service> {
        let mut tables = self.tables.write().await;
        let row = find_mut(&mut tables.services, "service", |s| s.id == id)?;
        apply(&mut row.title, &input.title);
        apply(&mut row.description, &input.description);
        apply(&mut row.icon, &input.icon);
        apply(&mut row.is_active, &input.is_active);
        apply(&mut row.sort_order, &input.sort_order);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_service(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.services, "service", |s| s.id == id)
    }

    async fn list_portfolio_projects(&self) -> StorageResult<Vec<PortfolioProject>> {
        let tables = self.tables.read().await;
        Ok(by_sort_order(tables.portfolio.clone(), |p| (p.sort_order, p.id)))
    }

    async fn list_published_portfolio_projects(&self) -> StorageResult<Vec<PortfolioProject>> {
        let tables = self.tables.read().await;
        let rows = tables
            .portfolio
            .iter()
            .filter(|p| p.is_published)
            .cloned()
            .collect();
        Ok(by_sort_order(rows, |p| (p.sort_order, p.id)))
    }

    async fn list_portfolio_projects_by_category(
        &self,
        category: ProjectCategory,
    ) -> StorageResult<Vec<PortfolioProject>> {
        let tables = self.tables.read().await;
        let rows = tables
            .portfolio
            .iter()
            .filter(|p| p.is_published && p.category == category)
            .cloned()
            .collect();
        Ok(by_sort_order(rows, |p| (p.sort_order, p.id)))
    }

    async fn create_portfolio_project(
        &self,
        input: &NewPortfolioProject,
    ) -> StorageResult<PortfolioProject> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let row = PortfolioProject {
            id: tables.next_id(),
            title: input.title.clone(),
            description: input.description.clone(),
            category: input.category,
            image_url: input.image_url.clone(),
            is_published: input.is_published,
            metadata: input.metadata.clone(),
            sort_order: input.sort_order,
            created_at: now,
            updated_at: now,
        };
        tables.portfolio.push(row.clone());
        Ok(row)
    }

    async fn update_portfolio_project(
        &self,
        id: i32,
        input: &UpdatePortfolioProject,
    ) -> StorageResult<PortfolioProject> {
        let mut tables = self.tables.write().await;
        let row = find_mut(&mut tables.portfolio, "portfolio project", |p| p.id == id)?;
        apply(&mut row.title, &input.title);
        apply(&mut row.description, &input.description);
        apply(&mut row.category, &input.category);
        apply(&mut row.image_url, &input.image_url);
        apply(&mut row.is_published, &input.is_published);
        apply(&mut row.metadata, &input.metadata);
        apply(&mut row.sort_order, &input.sort_order);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_portfolio_project(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.portfolio, "portfolio project", |p| p.id == id)
    }

    async fn list_team_members(&self) -> StorageResult<Vec<TeamMember>> {
        let tables = self.tables.read().await;
        Ok(by_sort_order(tables.team.clone(), |m| (m.sort_order, m.id)))
    }

    async fn list_active_team_members(&self) -> StorageResult<Vec<TeamMember>> {
        let tables = self.tables.read().await;
        let rows = tables.team.iter().filter(|m| m.is_active).cloned().collect();
        Ok(by_sort_order(rows, |m| (m.sort_order, m.id)))
    }

    async fn create_team_member(&self, input: &NewTeamMember) -> StorageResult<TeamMember> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let row = TeamMember {
            id: tables.next_id(),
            name: input.name.clone(),
            position: input.position.clone(),
            bio: input.bio.clone(),
            image_url: input.image_url.clone(),
            is_active: input.is_active,
            sort_order: input.sort_order,
            created_at: now,
            updated_at: now,
        };
        tables.team.push(row.clone());
        Ok(row)
    }

    async fn update_team_member(
        &self,
        id: i32,
        input: &UpdateTeamMember,
    ) -> StorageResult<TeamMember> {
        let mut tables = self.tables.write().await;
        let row = find_mut(&mut tables.team, "team member", |m| m.id == id)?;
        apply(&mut row.name, &input.name);
        apply(&mut row.position, &input.position);
        apply(&mut row.bio, &input.bio);
        apply(&mut row.image_url, &input.image_url);
        apply(&mut row.is_active, &input.is_active);
        apply(&mut row.sort_order, &input.sort_order);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_team_member(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.team, "team member", |m| m.id == id)
    }

    async fn list_blog_categories(&self) -> StorageResult<Vec<BlogCategory>> {
        let tables = self.tables.read().await;
        let mut rows = tables.categories.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn create_blog_category(&self, input: &NewBlogCategory) -> StorageResult<BlogCategory> {
        let mut tables = self.tables.write().await;
        let slug = input.resolved_slug();
        if tables
            .categories
            .iter()
            .any(|c| c.name == input.name || c.slug == slug)
        {
            return Err(StorageError::Conflict("blog category"));
        }
        let row = BlogCategory {
            id: tables.next_id(),
            name: input.name.clone(),
            slug,
            description: input.description.clone(),
            created_at: Utc::now(),
        };
        tables.categories.push(row.clone());
        Ok(row)
    }

    async fn update_blog_category(
        &self,
        id: i32,
        input: &UpdateBlogCategory,
    ) -> StorageResult<BlogCategory> {
        let mut tables = self.tables.write().await;
        let clash = tables.categories.iter().any(|c| {
            c.id != id
                && (input.name.as_ref() == Some(&c.name) || input.slug.as_ref() == Some(&c.slug))
        });
        if clash {
            return Err(StorageError::Conflict("blog category"));
        }
        let row = find_mut(&mut tables.categories, "blog category", |c| c.id == id)?;
        apply(&mut row.name, &input.name);
        apply(&mut row.slug, &input.slug);
        apply(&mut row.description, &input.description);
        Ok(row.clone())
    }

    async fn delete_blog_category(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.categories, "blog category", |c| c.id == id)?;
        for post in tables.posts.iter_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
        Ok(())
    }

    async fn list_blog_tags(&self) -> StorageResult<Vec<BlogTag>> {
        let tables = self.tables.read().await;
        let mut rows = tables.tags.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn create_blog_tag(&self, input: &NewBlogTag) -> StorageResult<BlogTag> {
        let mut tables = self.tables.write().await;
        let slug = input.resolved_slug();
        if tables
            .tags
            .iter()
            .any(|t| t.name == input.name || t.slug == slug)
        {
            return Err(StorageError::Conflict("blog tag"));
        }
        let row = BlogTag {
            id: tables.next_id(),
            name: input.name.clone(),
            slug,
            created_at: Utc::now(),
        };
        tables.tags.push(row.clone());
        Ok(row)
    }

    async fn update_blog_tag(&self, id: i32, input: &UpdateBlogTag) -> StorageResult<BlogTag> {
        let mut tables = self.tables.write().await;
        let clash = tables.tags.iter().any(|t| {
            t.id != id
                && (input.name.as_ref() == Some(&t.name) || input.slug.as_ref() == Some(&t.slug))
        });
        if clash {
            return Err(StorageError::Conflict("blog tag"));
        }
        let row = find_mut(&mut tables.tags, "blog tag", |t| t.id == id)?;
        apply(&mut row.name, &input.name);
        apply(&mut row.slug, &input.slug);
        Ok(row.clone())
    }

    async fn delete_blog_tag(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.tags, "blog tag", |t| t.id == id)?;
        tables.post_tags.retain(|link| link.tag_id != id);
        Ok(())
    }

    async fn list_blog_posts(&self) -> StorageResult<Vec<BlogPost>> {
        let tables = self.tables.read().await;
        let mut rows = tables.posts.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn list_published_blog_posts(&self) -> StorageResult<Vec<BlogPost>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<BlogPost> = tables
            .posts
            .iter()
            .filter(|p| p.is_published)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            let by_date = match (a.published_at, b.published_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_date.then(b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn get_blog_post(&self, id: i32) -> StorageResult<Option<BlogPost>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn get_blog_post_by_slug(&self, slug: &str) -> StorageResult<Option<BlogPost>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn create_blog_post(&self, input: &NewBlogPost) -> StorageResult<BlogPost> {
        let mut tables = self.tables.write().await;
        let slug = input.resolved_slug();
        if tables.posts.iter().any(|p| p.slug == slug) {
            return Err(StorageError::Conflict("blog post"));
        }
        tables.check_post_refs(input.author_id.as_ref(), input.category_id)?;
        let now = Utc::now();
        let row = BlogPost {
            id: tables.next_id(),
            title: input.title.clone(),
            slug,
            excerpt: input.excerpt.clone(),
            content: input.content.clone(),
            image_url: input.image_url.clone(),
            is_published: input.is_published,
            meta_title: input.meta_title.clone(),
            meta_description: input.meta_description.clone(),
            meta_keywords: input.meta_keywords.clone(),
            author_id: input.author_id.clone(),
            category_id: input.category_id,
            published_at: input.published_at,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(row.clone());
        Ok(row)
    }

    async fn update_blog_post(&self, id: i32, input: &UpdateBlogPost) -> StorageResult<BlogPost> {
        let mut tables = self.tables.write().await;
        if let Some(slug) = &input.slug {
            if tables.posts.iter().any(|p| p.id != id && &p.slug == slug) {
                return Err(StorageError::Conflict("blog post"));
            }
        }
        tables.check_post_refs(
            input.author_id.as_ref().and_then(Option::as_ref),
            input.category_id.flatten(),
        )?;
        let row = find_mut(&mut tables.posts, "blog post", |p| p.id == id)?;
        apply(&mut row.title, &input.title);
        apply(&mut row.slug, &input.slug);
        apply(&mut row.excerpt, &input.excerpt);
        apply(&mut row.content, &input.content);
        apply(&mut row.image_url, &input.image_url);
        apply(&mut row.is_published, &input.is_published);
        apply(&mut row.meta_title, &input.meta_title);
        apply(&mut row.meta_description, &input.meta_description);
        apply(&mut row.meta_keywords, &input.meta_keywords);
        apply(&mut row.author_id, &input.author_id);
        apply(&mut row.category_id, &input.category_id);
        apply(&mut row.published_at, &input.published_at);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_blog_post(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.posts, "blog post", |p| p.id == id)?;
        tables.post_tags.retain(|link| link.post_id != id);
        Ok(())
    }

    async fn add_tag_to_post(&self, post_id: i32, tag_id: i32) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == post_id) {
            return Err(StorageError::InvalidReference("blog post"));
        }
        if !tables.tags.iter().any(|t| t.id == tag_id) {
            return Err(StorageError::InvalidReference("blog tag"));
        }
        if tables
            .post_tags
            .iter()
            .any(|link| link.post_id == post_id && link.tag_id == tag_id)
        {
            return Ok(());
        }
        let id = tables.next_id();
        tables.post_tags.push(BlogPostTag {
            id,
            post_id,
            tag_id,
        });
        Ok(())
    }

    async fn remove_tag_from_post(&self, post_id: i32, tag_id: i32) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.post_tags, "blog post tag", |link| {
            link.post_id == post_id && link.tag_id == tag_id
        })
    }

    async fn list_post_tags(&self, post_id: i32) -> StorageResult<Vec<BlogTag>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<BlogTag> = tables
            .tags
            .iter()
            .filter(|t| {
                tables
                    .post_tags
                    .iter()
                    .any(|link| link.post_id == post_id && link.tag_id == t.id)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn list_testimonials(&self) -> StorageResult<Vec<Testimonial>> {
        let tables = self.tables.read().await;
        Ok(by_sort_order(tables.testimonials.clone(), |t| (t.sort_order, t.id)))
    }

    async fn list_published_testimonials(&self) -> StorageResult<Vec<Testimonial>> {
        let tables = self.tables.read().await;
        let rows = tables
            .testimonials
            .iter()
            .filter(|t| t.is_published)
            .cloned()
            .collect();
        Ok(by_sort_order(rows, |t| (t.sort_order, t.id)))
    }

    async fn create_testimonial(&self, input: &NewTestimonial) -> StorageResult<Testimonial> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let row = Testimonial {
            id: tables.next_id(),
            customer_name: input.customer_name.clone(),
            customer_title: input.customer_title.clone(),
            customer_image_url: input.customer_image_url.clone(),
            content: input.content.clone(),
            rating: input.rating,
            is_published: input.is_published,
            sort_order: input.sort_order,
            created_at: now,
            updated_at: now,
        };
        tables.testimonials.push(row.clone());
        Ok(row)
    }

    async fn update_testimonial(
        &self,
        id: i32,
        input: &UpdateTestimonial,
    ) -> StorageResult<Testimonial> {
        let mut tables = self.tables.write().await;
        let row = find_mut(&mut tables.testimonials, "testimonial", |t| t.id == id)?;
        apply(&mut row.customer_name, &input.customer_name);
        apply(&mut row.customer_title, &input.customer_title);
        apply(&mut row.customer_image_url, &input.customer_image_url);
        apply(&mut row.content, &input.content);
        apply(&mut row.rating, &input.rating);
        apply(&mut row.is_published, &input.is_published);
        apply(&mut row.sort_order, &input.sort_order);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_testimonial(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.testimonials, "testimonial", |t| t.id == id)
    }

    async fn create_contact_submission(
        &self,
        input: &NewContactSubmission,
    ) -> StorageResult<ContactSubmission> {
        let mut tables = self.tables.write().await;
        let row = ContactSubmission {
            id: tables.next_id(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            service_needed: input.service_needed.clone(),
            message: input.message.clone(),
            is_read: false,
            created_at: Utc::now(),
        };
        tables.contacts.push(row.clone());
        Ok(row)
    }

    async fn list_contact_submissions(&self) -> StorageResult<Vec<ContactSubmission>> {
        let tables = self.tables.read().await;
        let mut rows = tables.contacts.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn set_contact_submission_read(&self, id: i32, is_read: bool) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let row = find_mut(&mut tables.contacts, "contact submission", |c| c.id == id)?;
        row.is_read = is_read;
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .sessions
            .iter()
            .any(|s| s.token_hash == session.token_hash)
        {
            return Err(StorageError::Conflict("session"));
        }
        tables.sessions.push(session.clone());
        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> StorageResult<Option<Session>> {
        let tables = self.tables.read().await;
        let now = Utc::now();
        Ok(tables
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash && s.expires_at > now)
            .cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.sessions.retain(|s| s.token_hash != token_hash);
        Ok(())
    }

    async fn delete_expired_sessions(&self) -> StorageResult<u64> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let before = tables.sessions.len();
        tables.sessions.retain(|s| s.expires_at > now);
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SessionIdentity;
    use chrono::Duration;

    fn post(title: &str, published: bool) -> NewBlogPost {
        NewBlogPost {
            title: title.to_string(),
            slug: None,
            excerpt: None,
            content: Some("<p>body</p>".into()),
            image_url: None,
            is_published: published,
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            author_id: None,
            category_id: None,
            published_at: None,
        }
    }

    fn service(title: &str, sort_order: i32, is_active: bool) -> NewService {
        NewService {
            title: title.to_string(),
            description: None,
            icon: None,
            is_active,
            sort_order,
        }
    }

    #[tokio::test]
    async fn test_active_services_sorted_by_sort_order() {
        let storage = MemoryStorage::new();
        storage.create_service(&service("Repair", 2, true)).await.unwrap();
        storage.create_service(&service("Install", 1, true)).await.unwrap();
        storage.create_service(&service("Retired", 0, false)).await.unwrap();

        let titles: Vec<String> = storage
            .list_active_services()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["Install", "Repair"]);
        assert_eq!(storage.list_services().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let storage = MemoryStorage::new();
        let err = storage
            .update_service(99, &UpdateService::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound("service")));
        assert!(matches!(
            storage.delete_team_member(99).await,
            Err(StorageError::NotFound("team member"))
        ));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_absent_fields() {
        let storage = MemoryStorage::new();
        let mut input = service("Tune-up", 3, true);
        input.icon = Some("fas fa-wrench".into());
        let created = storage.create_service(&input).await.unwrap();

        let update = UpdateService {
            title: Some("Seasonal Tune-up".into()),
            ..Default::default()
        };
        let updated = storage.update_service(created.id, &update).await.unwrap();
        assert_eq!(updated.title, "Seasonal Tune-up");
        assert_eq!(updated.icon.as_deref(), Some("fas fa-wrench"));
        assert_eq!(updated.sort_order, 3);
    }

    #[tokio::test]
    async fn test_explicit_null_clears_nullable_field() {
        let storage = MemoryStorage::new();
        let mut input = service("Duct Sealing", 1, true);
        input.icon = Some("fas fa-wind".into());
        input.description = Some("Stop leaks".into());
        let created = storage.create_service(&input).await.unwrap();

        let update = UpdateService {
            icon: Some(None),
            ..Default::default()
        };
        let updated = storage.update_service(created.id, &update).await.unwrap();
        assert_eq!(updated.icon, None);
        assert_eq!(updated.description.as_deref(), Some("Stop leaks"));
    }

    #[tokio::test]
    async fn test_company_content_upsert_replaces_by_section() {
        let storage = MemoryStorage::new();
        let mut input = UpsertCompanyContent {
            section: "hero".into(),
            title: Some("Comfort all year".into()),
            description: None,
            content: None,
            metadata: None,
        };
        let first = storage.upsert_company_content(&input).await.unwrap();
        input.title = Some("Cool summers".into());
        let second = storage.upsert_company_content(&input).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(storage.list_company_content().await.unwrap().len(), 1);
        let found = storage
            .get_company_content_by_section("hero")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title.as_deref(), Some("Cool summers"));
    }

    #[tokio::test]
    async fn test_duplicate_post_slug_conflicts() {
        let storage = MemoryStorage::new();
        storage.create_blog_post(&post("Filter Basics", true)).await.unwrap();
        let err = storage
            .create_blog_post(&post("Filter Basics", false))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict("blog post")));
    }

    #[tokio::test]
    async fn test_post_with_unknown_category_is_invalid_reference() {
        let storage = MemoryStorage::new();
        let mut input = post("Heat Pumps", true);
        input.category_id = Some(404);
        let err = storage.create_blog_post(&input).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidReference("blog category")));
    }

    #[tokio::test]
    async fn test_tag_links_are_idempotent_and_cascade() {
        let storage = MemoryStorage::new();
        let created = storage.create_blog_post(&post("Ductwork", true)).await.unwrap();
        let tag = storage
            .create_blog_tag(&NewBlogTag {
                name: "Maintenance".into(),
                slug: None,
            })
            .await
            .unwrap();

        storage.add_tag_to_post(created.id, tag.id).await.unwrap();
        storage.add_tag_to_post(created.id, tag.id).await.unwrap();
        assert_eq!(storage.list_post_tags(created.id).await.unwrap().len(), 1);

        storage.delete_blog_post(created.id).await.unwrap();
        assert!(storage.get_blog_post(created.id).await.unwrap().is_none());
        assert!(storage.list_post_tags(created.id).await.unwrap().is_empty());
        assert!(matches!(
            storage.remove_tag_from_post(created.id, tag.id).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deleting_tag_unlinks_posts() {
        let storage = MemoryStorage::new();
        let created = storage.create_blog_post(&post("Thermostats", true)).await.unwrap();
        let tag = storage
            .create_blog_tag(&NewBlogTag {
                name: "Smart Home".into(),
                slug: None,
            })
            .await
            .unwrap();
        storage.add_tag_to_post(created.id, tag.id).await.unwrap();

        storage.delete_blog_tag(tag.id).await.unwrap();
        assert!(storage.list_post_tags(created.id).await.unwrap().is_empty());
        assert!(storage.get_blog_post(created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deleting_category_clears_post_reference() {
        let storage = MemoryStorage::new();
        let category = storage
            .create_blog_category(&NewBlogCategory {
                name: "Cooling".into(),
                slug: None,
                description: None,
            })
            .await
            .unwrap();
        let mut input = post("AC Sizing", true);
        input.category_id = Some(category.id);
        let created = storage.create_blog_post(&input).await.unwrap();

        storage.delete_blog_category(category.id).await.unwrap();
        let reloaded = storage.get_blog_post(created.id).await.unwrap().unwrap();
        assert_eq!(reloaded.category_id, None);
    }

    #[tokio::test]
    async fn test_published_posts_newest_first_with_undated_last() {
        let storage = MemoryStorage::new();
        let now = Utc::now();

        let mut older = post("Older", true);
        older.published_at = Some(now - Duration::days(3));
        let mut newer = post("Newer", true);
        newer.published_at = Some(now - Duration::days(1));
        storage.create_blog_post(&post("Undated", true)).await.unwrap();
        storage.create_blog_post(&older).await.unwrap();
        storage.create_blog_post(&newer).await.unwrap();
        storage.create_blog_post(&post("Draft", false)).await.unwrap();

        let titles: Vec<String> = storage
            .list_published_blog_posts()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["Newer", "Older", "Undated"]);
    }

    #[tokio::test]
    async fn test_portfolio_category_filter_only_published() {
        let storage = MemoryStorage::new();
        for (title, category, published) in [
            ("Office Rooftop", ProjectCategory::Commercial, true),
            ("Home Furnace", ProjectCategory::Residential, true),
            ("Warehouse Draft", ProjectCategory::Commercial, false),
        ] {
            storage
                .create_portfolio_project(&NewPortfolioProject {
                    title: title.into(),
                    description: None,
                    category,
                    image_url: None,
                    is_published: published,
                    metadata: None,
                    sort_order: 0,
                })
                .await
                .unwrap();
        }

        let commercial = storage
            .list_portfolio_projects_by_category(ProjectCategory::Commercial)
            .await
            .unwrap();
        assert_eq!(commercial.len(), 1);
        assert_eq!(commercial[0].title, "Office Rooftop");
        assert_eq!(storage.list_published_portfolio_projects().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_invisible_and_purged() {
        let storage = MemoryStorage::new();
        let identity = SessionIdentity::User {
            id: "sub-1".into(),
            email: None,
        };
        storage
            .create_session(&Session {
                token_hash: "live".into(),
                identity: identity.clone(),
                expires_at: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();
        storage
            .create_session(&Session {
                token_hash: "stale".into(),
                identity,
                expires_at: Utc::now() - Duration::hours(1),
            })
            .await
            .unwrap();

        assert!(storage.get_session("live").await.unwrap().is_some());
        assert!(storage.get_session("stale").await.unwrap().is_none());
        assert_eq!(storage.delete_expired_sessions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_contact_read_flag_round_trip() {
        let storage = MemoryStorage::new();
        let created = storage
            .create_contact_submission(&NewContactSubmission {
                first_name: "Lee".into(),
                last_name: "Park".into(),
                email: "lee@example.com".into(),
                phone: None,
                service_needed: Some("Heating".into()),
                message: None,
            })
            .await
            .unwrap();
        assert!(!created.is_read);

        storage.set_contact_submission_read(created.id, true).await.unwrap();
        assert!(storage.list_contact_submissions().await.unwrap()[0].is_read);
        assert!(matches!(
            storage.set_contact_submission_read(999, true).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
