pub mod cart;
pub mod cart_item;
pub mod machine_slot;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod vending_machine;

pub use cart::Entity as Cart;
pub use cart_item::Entity as CartItem;
pub use machine_slot::Entity as MachineSlot;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use payment::Entity as Payment;
pub use product::Entity as Product;
pub use vending_machine::Entity as VendingMachine;

pub use cart::Model as CartModel;
pub use cart_item::Model as CartItemModel;
pub use machine_slot::Model as MachineSlotModel;
pub use order::Model as OrderModel;
pub use order_item::Model as OrderItemModel;
pub use payment::Model as PaymentModel;
pub use product::Model as ProductModel;
pub use vending_machine::Model as VendingMachineModel;
