pub mod shared {
    pub mod core {
        pub mod money;
        pub mod pagination;
    }
    pub mod infrastructure {
        pub mod message_channel;
        pub mod http {
            pub mod api_error;
            pub mod current_user;
            pub mod payment_gateway;
        }
    }
}

pub mod modules {
    pub mod catalog {
        pub mod core {
            pub mod ports;
            pub mod product;
        }
        pub mod use_cases {
            pub mod browse_products {
                pub mod inbound {
                    pub mod http;
                }
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod catalog_in_memory;
            }
        }
    }

    pub mod cart {
        pub mod core {
            pub mod cart;
            pub mod ports;
        }
        pub mod use_cases {
            pub mod manage_cart {
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod clear_cart_on_order_placed {
                pub mod consumer;
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod carts_in_memory;
            }
        }
    }

    pub mod addresses {
        pub mod core {
            pub mod address;
        }
        pub mod adapters {
            pub mod outbound {
                pub mod address_book_in_memory;
            }
        }
    }

    pub mod orders {
        pub mod core {
            pub mod order;
            pub mod outbox_event;
            pub mod ports;
            pub mod status;
        }
        pub mod use_cases {
            pub mod checkout {
                pub mod command;
                pub mod decide;
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod change_order_status {
                pub mod command;
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod list_orders {
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod relay_outbox {
                pub mod runner;
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod orders_in_memory;
                pub mod orders_postgres;
            }
        }
    }
}

pub mod shell;
