//! Catalog management service: authors, reference records, books and copies

use std::collections::HashMap;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorQuery, CreateAuthor, UpdateAuthor},
        book::{Book, BookDetails, BookQuery, CreateBook, UpdateBook},
        inventory::{CreateInventory, Inventory, InventoryQuery},
        reference::{Direction, NameQuery, NameRequest, Publisher},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // Authors

    pub async fn search_authors(&self, query: &AuthorQuery) -> AppResult<(Vec<Author>, i64)> {
        self.repository.authors.search(query).await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, author: CreateAuthor) -> AppResult<Author> {
        author.validate()?;
        self.repository.authors.create(&author).await
    }

    pub async fn update_author(&self, id: i32, author: UpdateAuthor) -> AppResult<Author> {
        author.validate()?;
        self.repository.authors.update(id, &author).await
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await
    }

    // Directions

    pub async fn search_directions(&self, query: &NameQuery) -> AppResult<(Vec<Direction>, i64)> {
        self.repository.directions.search(query).await
    }

    pub async fn get_direction(&self, id: i32) -> AppResult<Direction> {
        self.repository.directions.get_by_id(id).await
    }

    pub async fn create_direction(&self, request: NameRequest) -> AppResult<Direction> {
        request.validate()?;
        request.check_length::<Direction>()?;
        self.repository.directions.create(&request.name).await
    }

    pub async fn update_direction(&self, id: i32, request: NameRequest) -> AppResult<Direction> {
        request.validate()?;
        request.check_length::<Direction>()?;
        self.repository.directions.update(id, &request.name).await
    }

    pub async fn delete_direction(&self, id: i32) -> AppResult<()> {
        self.repository.directions.delete(id).await
    }

    // Publishers

    pub async fn search_publishers(&self, query: &NameQuery) -> AppResult<(Vec<Publisher>, i64)> {
        self.repository.publishers.search(query).await
    }

    pub async fn get_publisher(&self, id: i32) -> AppResult<Publisher> {
        self.repository.publishers.get_by_id(id).await
    }

    pub async fn create_publisher(&self, request: NameRequest) -> AppResult<Publisher> {
        request.validate()?;
        request.check_length::<Publisher>()?;
        self.repository.publishers.create(&request.name).await
    }

    pub async fn update_publisher(&self, id: i32, request: NameRequest) -> AppResult<Publisher> {
        request.validate()?;
        request.check_length::<Publisher>()?;
        self.repository.publishers.update(id, &request.name).await
    }

    pub async fn delete_publisher(&self, id: i32) -> AppResult<()> {
        self.repository.publishers.delete(id).await
    }

    // Books

    /// Search books, with authors, direction and publisher attached
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<BookDetails>, i64)> {
        let (books, total) = self.repository.books.search(query).await?;
        Ok((self.with_relations(books).await?, total))
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.get_by_id(id).await?;
        self.single(book).await
    }

    /// Create a book and its copies
    pub async fn create_book(&self, book: CreateBook) -> AppResult<BookDetails> {
        book.validate()?;

        self.repository.directions.get_by_id(book.direction_id).await?;
        self.repository.publishers.get_by_id(book.publisher_id).await?;
        let author_ids = self.checked_authors(&book.author_ids).await?;

        let created = self.repository.books.create(&book, &author_ids).await?;
        self.single(created).await
    }

    /// Update a book; a quantity change adds or retires copies
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<BookDetails> {
        book.validate()?;

        if let Some(direction_id) = book.direction_id {
            self.repository.directions.get_by_id(direction_id).await?;
        }
        if let Some(publisher_id) = book.publisher_id {
            self.repository.publishers.get_by_id(publisher_id).await?;
        }

        let mut book = book;
        if let Some(ref ids) = book.author_ids {
            book.author_ids = Some(self.checked_authors(ids).await?);
        }

        let updated = self.repository.books.update(id, &book).await?;
        self.single(updated).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    /// Deduplicate author ids and make sure each one exists
    async fn checked_authors(&self, ids: &[i32]) -> AppResult<Vec<i32>> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        for id in &ids {
            self.repository.authors.get_by_id(*id).await?;
        }
        Ok(ids)
    }

    async fn single(&self, book: Book) -> AppResult<BookDetails> {
        self.with_relations(vec![book])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Book details missing".to_string()))
    }

    async fn with_relations(&self, books: Vec<Book>) -> AppResult<Vec<BookDetails>> {
        let ids: Vec<i32> = books.iter().map(|b| b.id).collect();

        let mut authors: HashMap<i32, Vec<Author>> = HashMap::new();
        for (book_id, author) in self.repository.authors.for_books(&ids).await? {
            authors.entry(book_id).or_default().push(author);
        }

        // Tombstoned directions and publishers stay visible on existing books
        let mut directions: HashMap<i32, Option<Direction>> = HashMap::new();
        let mut publishers: HashMap<i32, Option<Publisher>> = HashMap::new();

        let mut result = Vec::with_capacity(books.len());
        for book in books {
            let direction = match book.direction_id {
                Some(id) => {
                    if !directions.contains_key(&id) {
                        directions.insert(id, self.repository.directions.find_any(id).await?);
                    }
                    directions.get(&id).cloned().flatten()
                }
                None => None,
            };
            let publisher = match book.publisher_id {
                Some(id) => {
                    if !publishers.contains_key(&id) {
                        publishers.insert(id, self.repository.publishers.find_any(id).await?);
                    }
                    publishers.get(&id).cloned().flatten()
                }
                None => None,
            };

            result.push(BookDetails {
                authors: authors.remove(&book.id).unwrap_or_default(),
                direction,
                publisher,
                book,
            });
        }

        Ok(result)
    }

    // Inventories

    pub async fn search_inventories(
        &self,
        query: &InventoryQuery,
    ) -> AppResult<(Vec<Inventory>, i64)> {
        self.repository.inventories.search(query).await
    }

    pub async fn get_inventory(&self, id: i32) -> AppResult<Inventory> {
        self.repository.inventories.get_by_id(id).await
    }

    /// Add one copy to a book
    pub async fn create_inventory(&self, request: CreateInventory) -> AppResult<Inventory> {
        self.repository.inventories.add_copy(request.book_id).await
    }

    /// Remove one copy from a book
    pub async fn delete_inventory(&self, id: i32) -> AppResult<()> {
        self.repository.inventories.remove_copy(id).await
    }
}
