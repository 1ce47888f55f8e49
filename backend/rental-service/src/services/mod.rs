pub mod rented_books;

pub use rented_books::RentedBookService;
