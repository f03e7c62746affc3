use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel, Order,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, sea_query::Expr,
};

use crate::{category::Category, entities::movie, models::NewMovie};

pub const SAMPLE_SIZE: u64 = 3;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("a film titled {0:?} already exists")]
    DuplicateTitle(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Every film, by category then title. Uncategorised films sort first.
    pub async fn list(&self) -> Result<Vec<movie::Model>, CatalogError> {
        let movies = movie::Entity::find()
            .order_by_asc(movie::Column::Category)
            .order_by_asc(movie::Column::Title)
            .all(&self.db)
            .await?;
        Ok(movies)
    }

    pub async fn insert(&self, new: NewMovie) -> Result<movie::Model, CatalogError> {
        let title = new.title.clone();
        let model = movie::ActiveModel {
            id: Default::default(),
            title: Set(new.title),
            year: Set(new.year),
            category: Set(None),
            description: Set(new.description),
            image_url: Set(new.image_url),
        };

        match model.insert(&self.db).await {
            Ok(movie) => {
                tracing::info!(movie_id = movie.id, title = %movie.title, "film added");
                Ok(movie)
            },
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                tracing::warn!(title = %title, "duplicate film title rejected");
                Err(CatalogError::DuplicateTitle(title))
            },
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get(&self, id: i32) -> Result<Option<movie::Model>, CatalogError> {
        Ok(movie::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Sets the category and nothing else. Returns `None` when the film is gone.
    pub async fn set_category(
        &self,
        id: i32,
        category: Category,
    ) -> Result<Option<movie::Model>, CatalogError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };

        let mut model = existing.into_active_model();
        model.category = Set(Some(category));
        let updated = model.update(&self.db).await?;

        tracing::info!(movie_id = id, category = category.as_str(), "film categorised");
        Ok(Some(updated))
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: i32) -> Result<bool, CatalogError> {
        let res = movie::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected > 0 {
            tracing::info!(movie_id = id, "film deleted");
        }
        Ok(res.rows_affected > 0)
    }

    /// Up to [`SAMPLE_SIZE`] films of one category in random order.
    pub async fn random_by_category(
        &self,
        category: Category,
    ) -> Result<Vec<movie::Model>, CatalogError> {
        let movies = movie::Entity::find()
            .filter(movie::Column::Category.eq(category))
            .order_by(Expr::cust("RANDOM()"), Order::Asc)
            .limit(SAMPLE_SIZE)
            .all(&self.db)
            .await?;
        tracing::debug!(category = category.as_str(), picked = movies.len(), "random sample");
        Ok(movies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film(title: &str) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            year: "2003".to_string(),
            description: format!("About {title}."),
            image_url: format!("https://img/{title}.jpg"),
        }
    }

    async fn catalog() -> Catalog {
        Catalog::new(crate::db::memory().await)
    }

    async fn add(catalog: &Catalog, title: &str, category: Category) -> movie::Model {
        let movie = catalog.insert(film(title)).await.unwrap();
        catalog.set_category(movie.id, category).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn insert_starts_without_category() {
        let catalog = catalog().await;
        let movie = catalog.insert(film("Love Actually")).await.unwrap();
        assert_eq!(movie.category, None);
        assert_eq!(catalog.get(movie.id).await.unwrap(), Some(movie));
    }

    #[tokio::test]
    async fn duplicate_title_is_rejected_and_first_kept() {
        let catalog = catalog().await;
        let first = catalog.insert(film("Elf")).await.unwrap();

        let mut again = film("Elf");
        again.year = "1999".to_string();
        let err = catalog.insert(again).await.unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateTitle(ref t) if t == "Elf"));

        let all = catalog.list().await.unwrap();
        assert_eq!(all, vec![first]);
    }

    #[tokio::test]
    async fn list_orders_by_category_then_title() {
        let catalog = catalog().await;
        add(&catalog, "B", Category::Summer).await;
        add(&catalog, "A", Category::Spring).await;
        add(&catalog, "C", Category::Spring).await;

        let order: Vec<_> = catalog
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|m| (m.title, m.category.unwrap()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A".to_string(), Category::Spring),
                ("C".to_string(), Category::Spring),
                ("B".to_string(), Category::Summer),
            ]
        );
    }

    #[tokio::test]
    async fn set_category_changes_only_category() {
        let catalog = catalog().await;
        let before = catalog.insert(film("Hocus Pocus")).await.unwrap();

        let after = catalog.set_category(before.id, Category::Halloween).await.unwrap().unwrap();
        assert_eq!(after.category, Some(Category::Halloween));
        assert_eq!(movie::Model { category: None, ..after.clone() }, before);

        let after = catalog.set_category(before.id, Category::Autumn).await.unwrap().unwrap();
        assert_eq!(catalog.get(before.id).await.unwrap().unwrap().category, Some(Category::Autumn));
        assert_eq!(after.title, "Hocus Pocus");
    }

    #[tokio::test]
    async fn set_category_on_missing_film() {
        let catalog = catalog().await;
        assert!(catalog.set_category(42, Category::Winter).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_row() {
        let catalog = catalog().await;
        let keep = catalog.insert(film("Jaws")).await.unwrap();
        let gone = catalog.insert(film("Grease")).await.unwrap();

        assert!(catalog.delete(gone.id).await.unwrap());
        assert_eq!(catalog.get(gone.id).await.unwrap(), None);
        assert_eq!(catalog.list().await.unwrap(), vec![keep]);
        assert!(!catalog.delete(gone.id).await.unwrap());
    }

    #[tokio::test]
    async fn random_sample_is_capped_and_filtered() {
        let catalog = catalog().await;
        for title in ["Elf", "Klaus", "Scrooged", "Jingle All the Way", "The Grinch"] {
            add(&catalog, title, Category::Christmas).await;
        }
        add(&catalog, "The Holiday", Category::ChristmasRomCom).await;
        catalog.insert(film("Uncategorised")).await.unwrap();

        let picked = catalog.random_by_category(Category::Christmas).await.unwrap();
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|m| m.category == Some(Category::Christmas)));

        let picked = catalog.random_by_category(Category::ChristmasRomCom).await.unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].title, "The Holiday");

        assert!(catalog.random_by_category(Category::Summer).await.unwrap().is_empty());
    }
}
